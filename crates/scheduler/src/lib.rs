//! Blueprint Scheduler Library
//!
//! Cooperative cancellation for background work.
//!
//! Page rasterization runs off the UI thread. Every request carries a
//! [`CancellationToken`]; the [`CancellationRegistry`] keeps at most one live
//! token per key so that a newer request for the same target supersedes the
//! older one, and bulk cancellation covers document changes and teardown.
//!
//! # Example
//!
//! ```
//! use blueprint_scheduler::CancellationRegistry;
//!
//! let registry = CancellationRegistry::new();
//! let page1 = registry.register(("plan.pdf", 1u32));
//! let page2 = registry.register(("plan.pdf", 2u32));
//!
//! // Leaving the document cancels everything issued for it
//! registry.cancel_where(|(doc, _)| *doc == "plan.pdf");
//! assert!(page1.is_cancelled() && page2.is_cancelled());
//! ```

pub mod cancel;

pub use cancel::{CancellationRegistry, CancellationToken};
