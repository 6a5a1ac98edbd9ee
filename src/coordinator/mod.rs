//! Coordinator role
//!
//! Waits for every walker to report, in whatever order they arrive, then
//! announces the end of the run. The coordinator never sends anything.

use crate::transport::CompletionReceiver;
use crate::Result;
use anyhow::Context;

/// Rank 0's role: count completion signals
#[derive(Debug, Clone)]
pub struct Controller {
    expected: usize,
}

impl Controller {
    /// Create a controller waiting for `expected` walkers
    pub fn new(expected: usize) -> Self {
        Self { expected }
    }

    pub fn expected(&self) -> usize {
        self.expected
    }

    /// Drain exactly `expected` signals, then print the summary line
    ///
    /// Blocks until the last walker reports. With no walkers it returns
    /// immediately without touching the receiver.
    pub fn run<R: CompletionReceiver>(self, receiver: &mut R) -> Result<usize> {
        let mut finished = 0;

        while finished < self.expected {
            let signal = receiver
                .recv()
                .with_context(|| {
                    format!("Waiting for walker {} of {}", finished + 1, self.expected)
                })?;
            finished += 1;
            log::debug!(
                "Controller: rank {} finished in {} steps ({}/{})",
                signal.source, signal.steps, finished, self.expected
            );
        }

        println!("{}", summary_line(finished));
        Ok(finished)
    }

    /// Like [`Controller::run`], but opens the receiver only if a walker is expected
    pub fn run_with<R, F>(self, open: F) -> Result<usize>
    where
        R: CompletionReceiver,
        F: FnOnce() -> Result<R>,
    {
        if self.expected == 0 {
            println!("{}", summary_line(0));
            return Ok(0);
        }

        let mut receiver = open()?;
        self.run(&mut receiver)
    }
}

/// The line the coordinator prints once every walker has reported
pub fn summary_line(count: usize) -> String {
    format!("Controller: All {} walkers have finished.", count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::channel::ChannelTransport;
    use crate::transport::{CompletionSender, CompletionSignal, Transport};

    /// Receiver that fails the test if it is ever read
    struct Untouched;

    impl CompletionReceiver for Untouched {
        fn recv(&mut self) -> Result<CompletionSignal> {
            panic!("receiver should not be read");
        }
    }

    #[test]
    fn test_summary_line_format() {
        assert_eq!(summary_line(3), "Controller: All 3 walkers have finished.");
    }

    #[test]
    fn test_no_walkers_returns_immediately() {
        let finished = Controller::new(0).run(&mut Untouched).unwrap();
        assert_eq!(finished, 0);
    }

    #[test]
    fn test_no_walkers_never_opens_receiver() {
        let finished = Controller::new(0)
            .run_with(|| -> Result<Untouched> { anyhow::bail!("listener unavailable") })
            .unwrap();
        assert_eq!(finished, 0);
    }

    #[test]
    fn test_open_failure_is_reported() {
        let result = Controller::new(2)
            .run_with(|| -> Result<Untouched> { anyhow::bail!("listener unavailable") });
        assert!(result.is_err());
    }

    #[test]
    fn test_drains_exactly_expected() {
        let mut transport = ChannelTransport::new();
        let mut inbound = transport.open_inbound().unwrap();

        for source in [3, 1, 2, 4] {
            transport
                .outbound(source)
                .send(CompletionSignal { source, steps: 7 })
                .unwrap();
        }

        let finished = Controller::new(3).run(&mut inbound).unwrap();
        assert_eq!(finished, 3);

        // The fourth signal is left for nobody
        assert_eq!(inbound.try_recv().unwrap().source, 4);
    }

    #[test]
    fn test_waits_for_late_walkers() {
        let mut transport = ChannelTransport::new();
        let mut inbound = transport.open_inbound().unwrap();

        let handles: Vec<_> = (1..=4)
            .map(|source| {
                let sender = transport.outbound(source);
                std::thread::spawn(move || {
                    std::thread::sleep(std::time::Duration::from_millis(10 * source as u64));
                    sender.send(CompletionSignal { source, steps: 1 }).unwrap();
                })
            })
            .collect();

        assert_eq!(Controller::new(4).run(&mut inbound).unwrap(), 4);
        for handle in handles {
            handle.join().unwrap();
        }
    }

    #[test]
    fn test_error_when_walkers_vanish() {
        let mut transport = ChannelTransport::new();
        let mut inbound = transport.open_inbound().unwrap();
        transport
            .outbound(1)
            .send(CompletionSignal { source: 1, steps: 2 })
            .unwrap();
        drop(transport);

        assert!(Controller::new(2).run(&mut inbound).is_err());
    }
}
