//! Dispatch contract between a session and its owner.

use openlive_protocol::ApplicationMessage;

/// Receives every decoded application message, once each, in decode order.
///
/// Routing by `cmd` is up to the implementor; the session never looks at it.
/// Closures taking an [`ApplicationMessage`] implement this trait.
pub trait Dispatch {
    fn dispatch(&mut self, message: ApplicationMessage);
}

impl<F> Dispatch for F
where
    F: FnMut(ApplicationMessage),
{
    fn dispatch(&mut self, message: ApplicationMessage) {
        self(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn deliver<D: Dispatch>(dispatch: &mut D, cmds: &[&str]) {
        for cmd in cmds {
            dispatch.dispatch(ApplicationMessage::new(*cmd, json!({})));
        }
    }

    #[test]
    fn test_closure_dispatch() {
        let mut seen = Vec::new();
        let mut dispatch = |msg: ApplicationMessage| seen.push(msg.cmd);
        deliver(&mut dispatch, &["A", "B"]);
        assert_eq!(seen, vec!["A", "B"]);
    }
}
