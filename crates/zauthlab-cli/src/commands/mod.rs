pub mod catalog;
pub mod compare;
pub mod study;

use std::time::{SystemTime, UNIX_EPOCH};

use serde::Serialize;
use uuid::Uuid;

use zauthlab_core::endpoint::Endpoint;
use zauthlab_core::interrupt::InterruptFlag;
use zauthlab_core::sim::sim_catalog;

/// Identity block stamped into every exported report.
#[derive(Debug, Clone, Serialize)]
pub struct RunMeta {
    pub run_id: String,
    pub created_unix_ms: u64,
    pub tool_version: &'static str,
}

impl RunMeta {
    pub fn new() -> Self {
        Self {
            run_id: Uuid::new_v4().to_string(),
            created_unix_ms: SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .unwrap_or_default()
                .as_millis() as u64,
            tool_version: zauthlab_core::VERSION,
        }
    }
}

/// Wire Ctrl+C to an interrupt flag the engines sample at safe boundaries.
pub fn wire_interrupt() -> InterruptFlag {
    let flag = InterruptFlag::new();
    let handle = flag.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        eprintln!("\nInterrupt received; finishing the current step...");
        handle.trip();
    }) {
        eprintln!("Warning: could not install Ctrl+C handler: {e}");
    }
    flag
}

/// Load an endpoint catalog from a JSON file, or build the simulated one.
/// A file the run cannot parse is a hard error — there is nothing valid to
/// iterate over.
pub fn load_catalog(path: Option<&str>, per_category: usize) -> Vec<Endpoint> {
    let Some(path) = path else {
        return sim_catalog(per_category);
    };
    let raw = match std::fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) => {
            eprintln!("Error reading catalog '{path}': {e}");
            std::process::exit(1);
        }
    };
    match serde_json::from_str::<Vec<Endpoint>>(&raw) {
        Ok(endpoints) if endpoints.is_empty() => {
            eprintln!("Error: catalog '{path}' contains no endpoints");
            std::process::exit(1);
        }
        Ok(endpoints) => endpoints,
        Err(e) => {
            eprintln!("Error parsing catalog '{path}': {e}");
            std::process::exit(1);
        }
    }
}

/// Write a report as pretty JSON, exiting on I/O failure.
pub fn write_json<T: Serialize>(path: &str, report: &T) {
    let json = match serde_json::to_string_pretty(report) {
        Ok(json) => json,
        Err(e) => {
            eprintln!("Error serializing report: {e}");
            std::process::exit(1);
        }
    };
    if let Err(e) = std::fs::write(path, json) {
        eprintln!("Error writing '{path}': {e}");
        std::process::exit(1);
    }
    println!("\nReport written to {path}");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_load_catalog_defaults_to_simulation() {
        let catalog = load_catalog(None, 4);
        assert_eq!(catalog.len(), 12);
    }

    #[test]
    fn test_load_catalog_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"[{{"url": "https://example.invalid/p", "name": "p",
                 "category": "pool", "declared_price": 0.01}}]"#
        )
        .unwrap();
        let catalog = load_catalog(file.path().to_str(), 4);
        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog[0].name, "p");
        assert!(catalog[0].requested_price.is_none());
    }

    #[test]
    fn test_run_meta_has_identity() {
        let a = RunMeta::new();
        let b = RunMeta::new();
        assert_ne!(a.run_id, b.run_id);
        assert_eq!(a.tool_version, zauthlab_core::VERSION);
    }
}
