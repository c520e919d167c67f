//! Shared core for Outpost: turns an AI response into declared outputs and
//! acts on them (display, write to disk, or run after confirmation).

pub mod config;
pub mod confirm;
pub mod dispatcher;
pub mod display;
pub mod error;
pub mod extract;
pub mod outputs;
pub mod response;
pub mod structured;
pub mod unescape;
pub mod writers;

pub use config::{CommandConfig, DispatchConfig};
pub use confirm::{CommandOutcome, CommandResult, CommandRunner, Confirmer, ShellRunner, TerminalConfirmer};
pub use dispatcher::{
    DispatchEvent, DispatchReport, DisplaySink, NullSink, OutputActionDispatcher, OutputOutcome,
    NO_CONTENT,
};
pub use error::{OutpostError, Result};
pub use outputs::{
    load_output_definitions, load_output_specs, OutputAction, OutputContent, OutputDefinition,
    OutputSpec, OutputType, ResolutionStatus, ResolvedOutput,
};
pub use response::{NormalizedResponse, Response};
pub use structured::StructuredDataExtractor;
pub use writers::{FileWriter, FileWriterChain, WriteRequest};
