//! # zfm
//!
//! Protocol engine for ZhianTec/GROW ZFM and R50x optical fingerprint
//! modules over a serial link.
//!
//! ## Features
//!
//! - Frame codec with resynchronization over noisy UART reads
//! - FIFO command/response correlation across tasks
//! - Semantic events derived from raw confirmation codes
//! - Enrollment, verification, deletion and maintenance flows with
//!   retry and timeout policy
//!
//! ## Quick start
//!
//! ```no_run
//! use tokio::net::TcpStream;
//! use zfm::{Engine, Event};
//! use zfm_transport::{IoRx, IoTx};
//!
//! #[tokio::main]
//! async fn main() {
//!     let stream = TcpStream::connect("192.168.4.1:3333").await.unwrap();
//!     let (read_half, write_half) = stream.into_split();
//!
//!     let engine = Engine::new(IoTx::new(write_half), IoRx::new(read_half));
//!     engine.register_handler(|event: &Event| println!("{event}"));
//!
//!     match engine.enroll(5).await {
//!         Ok(()) => println!("enrolled at slot 5"),
//!         Err(e) => eprintln!("enrollment failed: {e}"),
//!     }
//! }
//! ```

pub mod capture;
pub mod engine;
pub mod error;
pub mod event;
pub mod flows;
pub mod signal;

mod queue;
mod reader;

// Re-exports
pub use capture::{CaptureStatus, TemplateCapture};
pub use engine::{Engine, FingerHint, COMMAND_QUEUE_CAPACITY, RESPONSE_QUEUE_CAPACITY};
pub use error::{EnrollError, Error, FlowError, Result, VerifyError};
pub use event::{derive_event, Event, EventHandler, EventKind};
pub use flows::MAX_ATTEMPTS;
pub use signal::StepOutcome;

// Re-export protocol and payload types
pub use zfm_core::{Command, Packet, PacketKind, StatusCode, DEFAULT_ADDRESS, DEFAULT_PASSWORD};
pub use zfm_types::{IndexTable, SearchMatch, SystemParameters};
