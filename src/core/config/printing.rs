use crate::core::config::data::{path_display, Config};

impl Config {
    pub fn print_all(&self) {
        println!("Current configuration:");
        match &self.data_dir {
            Some(dir) => println!("  data-dir: {}", path_display(dir)),
            None => println!("  data-dir: (default)"),
        }
        println!("  backend: {}", self.backend_mode());
        let mock = self.mock.clone().unwrap_or_default();
        println!(
            "  mock: latency {}ms, chunk delay {}-{}ms",
            mock.latency_ms, mock.chunk_delay_min_ms, mock.chunk_delay_max_ms
        );
        if self.base_urls.is_empty() {
            println!("  base-urls: (none set)");
        } else {
            println!("  base-urls:");
            let mut entries: Vec<_> = self.base_urls.iter().collect();
            entries.sort_by_key(|(k, _)| *k);
            for (provider, url) in entries {
                println!("    {provider}: {url}");
            }
        }
    }
}
