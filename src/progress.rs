// src/progress.rs

//! Terminal rendering of task progress
//!
//! Bridges a task's event stream onto an indicatif spinner that upgrades
//! itself to a bar once bounded progress arrives. Progress and status lines
//! go to stdout; they are the only stdout output preceding a command's
//! terminal summary.

use crate::error::Result;
use crate::task::{Future, TaskEvent};
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::time::Duration;

/// A progress display attached to one future's event stream
pub struct TaskProgress {
    bar: ProgressBar,
}

impl TaskProgress {
    /// Attach a spinner to `future`, upgrading to a bar when totals arrive
    pub fn attach<T: Clone + Send + 'static>(label: &str, future: &Future<T>) -> Self {
        let bar = ProgressBar::new_spinner();
        bar.set_draw_target(ProgressDrawTarget::stdout());
        bar.set_style(spinner_style());
        bar.set_message(label.to_string());
        bar.enable_steady_tick(Duration::from_millis(100));

        let handle = bar.clone();
        let mut bounded = false;
        future.subscribe(move |event| match event {
            TaskEvent::Status(status) => handle.set_message(status.clone()),
            TaskEvent::Progress { current, total } => {
                if *total > 0 {
                    if !bounded {
                        handle.set_style(bar_style());
                        bounded = true;
                    }
                    handle.set_length(*total);
                    handle.set_position(*current);
                }
            }
            // The display is torn down at termination; the command prints
            // its own summary line afterwards.
            TaskEvent::Finished | TaskEvent::Failed(_) | TaskEvent::Canceled => {
                handle.finish_and_clear();
            }
        });

        Self { bar }
    }

    /// Remove the display ahead of termination
    pub fn clear(self) {
        self.bar.finish_and_clear();
    }
}

/// Block on `future` while rendering its progress stream
pub fn wait_rendered<T: Clone + Send + 'static>(label: &str, future: &Future<T>) -> Result<T> {
    let _display = TaskProgress::attach(label, future);
    future.wait()
}

fn spinner_style() -> ProgressStyle {
    ProgressStyle::default_spinner()
        .template("{spinner:.green} {msg}")
        .expect("Invalid spinner template")
}

fn bar_style() -> ProgressStyle {
    ProgressStyle::default_bar()
        .template("{msg} [{bar:40.green/dim}] {pos}/{len}")
        .expect("Invalid progress bar template")
        .progress_chars("##-")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task;

    #[test]
    fn test_wait_rendered_returns_the_value() {
        let future = task::spawn(|notifier| {
            notifier.status("working");
            notifier.progress(2, 4);
            Ok(17)
        });
        assert_eq!(wait_rendered("test", &future).unwrap(), 17);
    }

    #[test]
    fn test_wait_rendered_propagates_failure() {
        let future = task::spawn::<(), _>(|_n| {
            Err(crate::error::Error::Network("unreachable".into()))
        });
        assert!(wait_rendered("test", &future).is_err());
    }
}
