//! Signal bridge subsystem.
//!
//! # Data Flow
//! ```text
//! HTML request with signals
//!     → subjects.rs (publish to <ns>.session.<id>, <ns>.tab.<id>)
//!     → bus.rs SignalBridge (local.rs: broadcast channel per subject)
//!     → Subscription forwarder
//!     → live stream's inbox (mpsc) → merged into its Signals
//! ```

pub mod bus;
pub mod local;
pub mod signals;
pub mod subjects;

pub use bus::{BridgeError, SignalBridge, Subscription};
pub use local::LocalBridge;
pub use signals::{SignalError, SignalValue, Signals};
pub use subjects::{publish_signals, session_subject, subscribe_signals, tab_subject};
