//! Spinner shown while the registry is queried.

use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, info};
use std::io::IsTerminal;
use std::time::Duration;

pub struct Spinner {
    bar: ProgressBar,
    announce: bool,
}

impl Spinner {
    /// Starts a spinner on stderr. It is only drawn when `visible` is set and
    /// stderr is a terminal; status lines still go to the log.
    pub fn start(message: String, visible: bool) -> Self {
        let bar = if visible && std::io::stderr().is_terminal() {
            let pb = ProgressBar::new_spinner();
            if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}") {
                pb.set_style(style);
            }
            pb.set_message(message.clone());
            pb.enable_steady_tick(Duration::from_millis(100));
            pb
        } else {
            ProgressBar::hidden()
        };

        if visible {
            info!("{}", message);
        } else {
            debug!("{}", message);
        }

        Self {
            bar,
            announce: visible,
        }
    }

    #[cfg(test)]
    fn is_hidden(&self) -> bool {
        self.bar.is_hidden()
    }

    pub fn finish(self, message: &str) {
        self.bar.finish_and_clear();
        if self.announce {
            info!("{}", message);
        } else {
            debug!("{}", message);
        }
    }
}
