//! Terminal output for `queryscope`: the ranked query list, one per line,
//! and (with the `parallel` feature) a progress bar over dictionary
//! precomputation.

use crate::ranker::RankedQuery;

pub fn print_ranked_queries(queries: &[RankedQuery]) {
    for q in queries {
        println!("{}", q.query);
    }
}

#[cfg(feature = "parallel")]
pub fn progress_bar(len: u64, message: &'static str) -> indicatif::ProgressBar {
    let bar = indicatif::ProgressBar::new(len);
    bar.set_style(
        indicatif::ProgressStyle::with_template("{msg} [{bar:40}] {pos}/{len}")
            .unwrap_or_else(|_| indicatif::ProgressStyle::default_bar()),
    );
    bar.set_message(message);
    bar
}
