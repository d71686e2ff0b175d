use std::any::Any;
use std::backtrace::{Backtrace, BacktraceStatus};
use std::panic;

use super::environment;

/// Sets the global [panic hook](std::panic::set_hook).
///
/// Panics are logged under the `srl_api::panics` target before the previous hook runs. Local
/// builds always capture a backtrace; elsewhere it is only included if `RUST_BACKTRACE` asks
/// for one.
pub fn install() {
    let old_hook = panic::take_hook();

    panic::set_hook(Box::new(move |panic_info| {
        let message = payload_as_str(panic_info.payload()).unwrap_or("<unknown>");
        let location = panic_info.location().map(ToString::to_string);
        let backtrace = if environment().is_local() {
            Some(Backtrace::force_capture())
        } else {
            Some(Backtrace::capture()).filter(|bt| bt.status() == BacktraceStatus::Captured)
        };

        match backtrace {
            Some(backtrace) => tracing::error!(
                target: "srl_api::panics",
                location = location.as_deref(),
                %backtrace,
                "thread panicked: {message}",
            ),
            None => tracing::error!(
                target: "srl_api::panics",
                location = location.as_deref(),
                "thread panicked: {message}",
            ),
        }

        old_hook(panic_info)
    }));
}

pub(crate) fn payload_as_str(payload: &(dyn Any + Send)) -> Option<&str> {
    payload
        .downcast_ref::<&'static str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_messages() {
        let payload: Box<dyn Any + Send> = Box::new("static message");
        assert_eq!(payload_as_str(&*payload), Some("static message"));

        let payload: Box<dyn Any + Send> = Box::new(format!("formatted {}", 42));
        assert_eq!(payload_as_str(&*payload), Some("formatted 42"));

        let payload: Box<dyn Any + Send> = Box::new(42_u8);
        assert_eq!(payload_as_str(&*payload), None);
    }
}
