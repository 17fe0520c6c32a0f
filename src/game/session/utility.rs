use async_std::channel::Sender;
use async_std::sync::Mutex;
use async_std::task;
use std::sync::Arc;
use std::time::Duration;

/// This `TimeoutGate` accepts a `Sender`, and sends a `timeout_msg`
/// after certain `delay`, like an alarm.
///
/// The alarm fires at most once. `cancel` consumes the gate and
/// guarantees the message is not sent afterwards.
///
/// The `Sender` inside `TimeoutGate` is dropped once the `timeout_msg`
/// is sent, or when the gate is cancelled.
pub(crate) struct TimeoutGate<T> {
    state: Arc<Mutex<State>>,
    sender: Arc<Mutex<Option<Sender<T>>>>,
}

#[derive(Debug, PartialEq)]
enum State {
    Waiting,
    Cancelled,
    TimeoutSent,
}

impl<T: Send + 'static> TimeoutGate<T> {
    /// if `delay` is None, the alarm never fires
    pub(crate) fn new(delay: Option<Duration>, sender: Sender<T>, timeout_msg: T) -> Self {
        let gate = TimeoutGate {
            state: Arc::new(Mutex::new(State::Waiting)),
            sender: Arc::new(Mutex::new(Some(sender))),
        };
        if let Some(delay) = delay {
            gate.fire_alarm(delay, timeout_msg);
        }
        gate
    }

    /// stop the alarm if it has not fired yet
    pub(crate) async fn cancel(self) {
        let mut state = self.state.lock().await;
        if *state == State::Waiting {
            *state = State::Cancelled;
            self.sender.lock().await.take();
        }
    }

    /// sleep for `delay` and send the timeout message
    fn fire_alarm(&self, delay: Duration, timeout_msg: T) {
        let state = self.state.clone();
        let sender = self.sender.clone();
        task::spawn(async move {
            task::sleep(delay).await;
            let mut state = state.lock().await;
            if *state == State::Waiting {
                *state = State::TimeoutSent;
                if let Some(sender) = sender.lock().await.take() {
                    let _ = sender.send(timeout_msg).await;
                }
            }
        });
    }
}
