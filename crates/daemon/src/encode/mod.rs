//! Encoding modules for the watch-folder transcoder

pub mod av1an;

pub use av1an::{
    build_av1an_command, run_av1an, run_av1an_blocking, Av1anEncodeParams, EncodeError,
    EncodeOutcome,
};
