//! # Cardflow Log
//!
//! In-process append-only log of card lifecycle events with named,
//! cursor-acknowledged consumers.
//!
//! The log provides:
//! - Synchronous append with strictly monotonic event ids
//! - Named consumers with independent cursors
//! - At-least-once delivery: an event is redelivered until acknowledged
//! - Poll- or notify-based wakeups for idle consumers
//!
//! ## Example
//!
//! ```rust
//! use cardflow_log::EventLog;
//!
//! let log = EventLog::new();
//! log.append(b"created").unwrap();
//!
//! let mut consumer = log.subscribe("committer");
//! while let Some((id, bytes)) = consumer.next() {
//!     println!("processing event {} ({} bytes)", id, bytes.len());
//!     consumer.ack(id);
//! }
//!
//! let info = log.consumer_info("committer");
//! println!("consumer lag: {}", info.lag);
//! ```

pub mod consumer;
pub mod log;
pub mod notification;

pub use consumer::Consumer;
pub use log::{ConsumerInfo, EventLog};
pub use notification::WakeStrategy;
