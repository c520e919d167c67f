//! Exit status for outpostctl

use outpost_common::OutpostError;

/// Exit code for success
pub const EXIT_SUCCESS: i32 = 0;

/// Exit code for general errors
pub const EXIT_GENERAL_ERROR: i32 = 1;

/// Exit code when the output definitions or config cannot be used
pub const EXIT_INVALID_INPUT: i32 = 64;

/// Exit code when no declared output could be found in the response
pub const EXIT_NO_CONTENT: i32 = 66;

/// Map an error to an exit code, looking through any added context
pub fn exit_code_for(err: &anyhow::Error) -> i32 {
    let core = err
        .chain()
        .find_map(|cause| cause.downcast_ref::<OutpostError>());
    match core {
        Some(
            OutpostError::InvalidDefinition(_)
            | OutpostError::DuplicateOutput(_)
            | OutpostError::Yaml(_)
            | OutpostError::Config(_),
        ) => EXIT_INVALID_INPUT,
        _ => EXIT_GENERAL_ERROR,
    }
}
