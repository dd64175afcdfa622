use std::fmt::Display;

/// Counters describing one selection call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SelectionStatistics {
    pub entries_in: usize,
    pub entries_kept: usize,
    pub entries_removed: usize,
    pub tasks: usize,
    pub threads: usize,
    pub iso: bool,
    pub execution_time_ms: f64,
}

impl SelectionStatistics {
    pub fn new(entries_in: usize, entries_kept: usize) -> Self {
        Self {
            entries_in,
            entries_kept,
            entries_removed: entries_in.saturating_sub(entries_kept),
            ..Default::default()
        }
    }

    /// True when the selection dropped at least one entry.
    pub fn indicates_modification(&self) -> bool {
        self.entries_removed > 0
    }

    /// Human readable report, one line per non-zero counter, timing last.
    pub fn emit(&self) -> Vec<String> {
        let mut lines = Vec::with_capacity(7);

        let counters = [
            ("Entries scanned", self.entries_in),
            ("Entries kept", self.entries_kept),
            ("Entries removed", self.entries_removed),
            ("Tasks", self.tasks),
            ("Threads", self.threads),
        ];

        for (label, value) in counters {
            if value > 0 {
                lines.push(format!("{}: {}", label, value));
            }
        }

        if self.iso {
            lines.push("Uniform value result: yes".to_string());
        }

        lines.push(format!(
            "Selection internal execution time: {:.6} milliseconds",
            self.execution_time_ms
        ));

        lines
    }
}

impl Display for SelectionStatistics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.emit().join("\n"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_removed_is_derived() {
        let stats = SelectionStatistics::new(10, 4);
        assert_eq!(stats.entries_removed, 6);
        assert!(stats.indicates_modification());
        assert!(!SelectionStatistics::new(3, 3).indicates_modification());
    }

    #[test]
    fn test_emit_skips_zero_counters() {
        let stats = SelectionStatistics {
            tasks: 2,
            threads: 1,
            execution_time_ms: 0.5,
            ..SelectionStatistics::new(5, 5)
        };
        assert_eq!(
            stats.emit(),
            vec![
                "Entries scanned: 5".to_string(),
                "Entries kept: 5".to_string(),
                "Tasks: 2".to_string(),
                "Threads: 1".to_string(),
                "Selection internal execution time: 0.500000 milliseconds".to_string(),
            ]
        );
    }

    #[test]
    fn test_emit_reports_iso() {
        let stats = SelectionStatistics { iso: true, ..SelectionStatistics::new(4, 1) };
        let lines = stats.emit();
        assert!(lines.contains(&"Entries removed: 3".to_string()));
        assert!(lines.contains(&"Uniform value result: yes".to_string()));
        assert!(lines.last().unwrap().starts_with("Selection internal execution time"));
    }
}
