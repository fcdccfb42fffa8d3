use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

pub(crate) trait StringExt {
    fn push_join(&mut self, separator: &str, items: impl IntoIterator<Item = impl AsRef<str>>);
}

impl StringExt for String {
    fn push_join(&mut self, separator: &str, items: impl IntoIterator<Item = impl AsRef<str>>) {
        for (idx, v) in items.into_iter().enumerate() {
            if idx > 0 {
                self.push_str(separator);
            }
            self.push_str(v.as_ref());
        }
    }
}

/// Shared flag polled by long running loops between rows. Clearing it asks every
/// holder to stop at the next row boundary.
#[derive(Debug, Clone)]
pub struct RunningFlag {
    running: Arc<AtomicBool>,
}

impl Default for RunningFlag {
    fn default() -> Self {
        RunningFlag {
            running: Arc::new(AtomicBool::new(true)),
        }
    }
}

impl RunningFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    pub fn stop(&self) {
        self.running.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_join_separates_items() {
        let mut sql = "select ".to_string();
        sql.push_join(", ", ["id", "name"]);
        assert_eq!(sql, "select id, name");

        let mut empty = String::new();
        empty.push_join(", ", Vec::<String>::new());
        assert_eq!(empty, "");
    }
}
