//! Admin notification collaborator invoked on recoverable failures.
//!
//! Every failed token operation is reported here as a human-readable string
//! before the typed error is returned to the caller. The sink is logging-only;
//! no client behavior depends on its availability.

// self
use crate::_prelude::*;

/// Sink receiving human-readable warnings about recoverable failures.
pub trait AdminNotifier
where
	Self: Send + Sync,
{
	/// Delivers one warning message. Implementations must not panic.
	fn warn(&self, message: &str);
}

/// Notifier that drops every message.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopNotifier;
impl AdminNotifier for NoopNotifier {
	fn warn(&self, _message: &str) {}
}

/// Notifier that forwards warnings to the `tracing` subscriber.
#[cfg(feature = "tracing")]
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingNotifier;
#[cfg(feature = "tracing")]
impl AdminNotifier for TracingNotifier {
	fn warn(&self, message: &str) {
		tracing::warn!(target: "sage_oauth::admin", "{message}");
	}
}

/// Returns the default notifier for the enabled feature set.
pub fn default_notifier() -> Arc<dyn AdminNotifier> {
	#[cfg(feature = "tracing")]
	{
		Arc::new(TracingNotifier)
	}
	#[cfg(not(feature = "tracing"))]
	{
		Arc::new(NoopNotifier)
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn custom_notifiers_capture_messages() {
		#[derive(Default)]
		struct Capture(Mutex<Vec<String>>);
		impl AdminNotifier for Capture {
			fn warn(&self, message: &str) {
				self.0.lock().push(message.to_owned());
			}
		}

		let capture = Capture::default();

		capture.warn("refresh failed");
		NoopNotifier.warn("dropped");

		assert_eq!(capture.0.lock().as_slice(), ["refresh failed".to_owned()]);
	}
}
