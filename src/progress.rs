use indicatif::{ProgressBar, ProgressStyle};
use std::cell::Cell;

pub struct CrawlProgress {
    bar: Option<ProgressBar>,
    finished: Cell<bool>,
}

impl CrawlProgress {
    pub fn new(total_products: u64, enabled: bool) -> Self {
        let bar = if enabled && total_products > 0 {
            let pb = ProgressBar::new(total_products);
            let style = ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} products {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("#>-");
            pb.set_style(style);
            Some(pb)
        } else {
            None
        };

        Self {
            bar,
            finished: Cell::new(false),
        }
    }

    /// Marks `index` products as done and shows the one being crawled.
    pub fn start_product(&self, index: usize, name: &str) {
        if let Some(ref pb) = self.bar {
            pb.set_position(index as u64);
            pb.set_message(name.to_string());
        }
    }

    pub fn finish(&self, violations: usize) {
        if self.finished.replace(true) {
            return;
        }

        if let Some(ref pb) = self.bar {
            pb.finish_with_message(format!("✓ done, {} violations", violations));
        }
    }
}

impl Drop for CrawlProgress {
    fn drop(&mut self) {
        // A bar abandoned mid-crawl is wiped; a finished one keeps its summary line.
        match &self.bar {
            Some(pb) if !self.finished.get() => pb.finish_and_clear(),
            _ => {}
        }
    }
}
