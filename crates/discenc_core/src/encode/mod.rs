//! Encoding of one title.
//!
//! # Architecture
//!
//! ```text
//! Encoder::run
//!     ├── TrackSelector         resolve requested tracks
//!     ├── EncodeCommandBuilder  options + title -> argument tokens
//!     ├── GainPipeline          (normalize) extract + analyze loudness
//!     ├── OutputMonitor         encoder stderr state machine
//!     └── TrackRenamer          name the output's tracks
//! ```

mod command;
mod encoder;
mod errors;
mod gain;
mod monitor;
mod options;
mod rename;

pub use command::{EncodeCommand, EncodeCommandBuilder, EncodePlan, SD_MAX_WIDTH};
pub use encoder::{BuiltEncode, EncodeOutcome, Encoder, EncoderContext};
pub use errors::{EncodeError, EncodeResult};
pub use gain::{GainPipeline, TrackGains};
pub use monitor::{MonitorEvent, OutputMonitor, ParseState};
pub use options::{EncodeOptions, OptionClock, Tracked};
pub use rename::{track_names, TrackName, TrackRenamer};
