//! Dictionary and bigram-timing table loading.
//!
//! Both are flat, human-editable inputs: a newline-separated query list and
//! a `char1,char2,mean_ms,std_ms` timing table. Grounded on the original
//! `Queries` loader's shape (`queries.py`), reimplemented without the
//! pandas/pickle layer it used — the dictionary is small enough that
//! `std::fs::read_to_string` plus a per-line split is all the runtime needs.

use std::collections::HashMap;
use std::path::Path;

#[derive(Debug, Clone, Default)]
pub struct BigramTable {
    table: HashMap<(char, char), (f64, f64)>,
}

impl BigramTable {
    pub fn lookup(&self, a: char, b: char) -> (f64, f64) {
        self.table.get(&(a, b)).copied().unwrap_or((0.0, 0.0))
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    pub fn from_rows(rows: impl IntoIterator<Item = (char, char, f64, f64)>) -> Self {
        let mut table = HashMap::new();
        for (a, b, mean, std) in rows {
            table.insert((a, b), (mean, std));
        }
        BigramTable { table }
    }

    pub fn load(path: &Path) -> std::io::Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let mut table = HashMap::new();
        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let fields: Vec<&str> = line.split(',').collect();
            if fields.len() != 4 {
                tracing::debug!(line, "skipping malformed bigram row");
                continue;
            }
            let (Some(a), Some(b)) = (fields[0].chars().next(), fields[1].chars().next()) else {
                continue;
            };
            let (Ok(mean), Ok(std)) = (fields[2].parse::<f64>(), fields[3].parse::<f64>()) else {
                continue;
            };
            table.insert((a, b), (mean, std));
        }
        Ok(BigramTable { table })
    }
}

/// Load a newline-separated dictionary file, skipping blank lines.
pub fn load_dictionary(path: &Path) -> std::io::Result<Vec<String>> {
    let text = std::fs::read_to_string(path)?;
    Ok(text
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_missing_bigram_returns_zero() {
        let table = BigramTable::default();
        assert_eq!(table.lookup('a', 'b'), (0.0, 0.0));
    }

    #[test]
    fn lookup_known_bigram_returns_stats() {
        let table = BigramTable::from_rows([('a', 'b', 120.0, 15.0)]);
        assert_eq!(table.lookup('a', 'b'), (120.0, 15.0));
    }
}
