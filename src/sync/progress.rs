use log::{info, warn};

use crate::repository::Uid;

/// Reports fetch progress for one folder. Large folders are logged in batches of
/// `floor(sqrt(total))` messages instead of one line per message.
#[derive(Debug)]
pub struct Progress<'a> {
    folder: &'a str,
    total: usize,
    interval: usize,
    done: usize,
    stored: Vec<Uid>,
}

impl<'a> Progress<'a> {
    pub fn new(folder: &'a str, total: usize, batch_threshold: usize) -> Self {
        let interval = if total > batch_threshold {
            let interval = total.isqrt();
            warn!("{total} new messages in {folder}, reporting progress every {interval} messages");
            interval
        } else {
            1
        };

        Self {
            folder,
            total,
            interval,
            done: 0,
            stored: Vec::new(),
        }
    }

    #[cfg(test)]
    pub fn interval(&self) -> usize {
        self.interval
    }

    /// Counts one attempted message, remembering it for the next report if it was stored.
    pub fn record(&mut self, uid: Uid, stored: bool) {
        self.done += 1;
        if stored {
            self.stored.push(uid);
        }
        if self.done % self.interval == 0 {
            self.report();
        }
    }

    /// Reports whatever was stored since the last report.
    pub fn finish(&mut self) {
        if !self.stored.is_empty() {
            self.report();
        }
    }

    fn report(&mut self) {
        if self.stored.is_empty() {
            return;
        }
        info!(
            "{}/{} of {}: got message(s) {}",
            self.done,
            self.total,
            self.folder,
            join_uids(&self.stored)
        );
        self.stored.clear();
    }
}

fn join_uids(uids: &[Uid]) -> String {
    uids.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}
