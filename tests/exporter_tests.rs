//! End-to-end tests for one scrape against in-memory kernel sources.

mod common;

use common::FakeHost;
use freebsd_exporter::collectors::CollectorKind;
use freebsd_exporter::cli::Args;
use freebsd_exporter::config::{self, Settings};
use freebsd_exporter::exporter::{self, Sources};

fn scrape(host: &FakeHost, settings: &Settings) -> String {
    let mut out = Vec::new();
    exporter::run(settings, &Sources::from_host(host), &mut out).expect("scrape succeeds");
    String::from_utf8(out).expect("output is UTF-8")
}

fn lines_with_prefix<'a>(text: &'a str, prefix: &str) -> Vec<&'a str> {
    text.lines().filter(|l| l.starts_with(prefix)).collect()
}

#[test]
fn test_full_scrape() {
    let text = scrape(&FakeHost::default(), &Settings::default());

    let expected = "HTTP/1.1 200 OK\r\n\
                    Content-Type: text/plain\r\n\
                    \r\n\
                    freebsd_fs_size_bytes{device=\"/dev/ada0p2\",type=\"ufs\",mountpoint=\"/\"} 512000\n\
                    freebsd_fs_used_bytes{device=\"/dev/ada0p2\",type=\"ufs\",mountpoint=\"/\"} 409600\n\
                    freebsd_fs_free_bytes{device=\"/dev/ada0p2\",type=\"ufs\",mountpoint=\"/\"} 76800\n\
                    freebsd_load1 0.500000\n\
                    freebsd_load5 0.750000\n\
                    freebsd_load15 1.000000\n\
                    freebsd_netif_rx_bytes{interface=\"em0\"} 1000\n\
                    freebsd_netif_tx_bytes{interface=\"em0\"} 2000\n\
                    freebsd_netif_errors{interface=\"em0\"} 3\n\
                    freebsd_mem_bufspace_bytes 65536\n\
                    freebsd_mem_size_bytes 4096000\n\
                    freebsd_mem_active_bytes 1638400\n\
                    freebsd_mem_inactive_bytes 1228800\n\
                    freebsd_mem_laundry_bytes 0\n\
                    freebsd_mem_wire_bytes 819200\n\
                    freebsd_mem_free_bytes 409600\n\
                    freebsd_mem_swap_size_bytes 1024\n\
                    freebsd_mem_swap_used_bytes 512\n\
                    freebsd_device_read_bytes{device=\"ada0\"} 1024\n\
                    freebsd_device_write_bytes{device=\"ada0\"} 2048\n";
    assert_eq!(text, expected);
}

#[test]
fn test_without_http_header() {
    let settings = Settings {
        http_header: false,
        ..Settings::default()
    };
    let text = scrape(&FakeHost::default(), &settings);
    assert!(text.starts_with("freebsd_fs_size_bytes{"));
    assert!(!text.contains("HTTP/1.1"));
}

#[test]
fn test_mount_table_failure_keeps_other_collectors() {
    let host = FakeHost {
        mounts: None,
        ..FakeHost::default()
    };
    let settings = Settings {
        http_header: false,
        ..Settings::default()
    };
    let text = scrape(&host, &settings);

    assert!(lines_with_prefix(&text, "freebsd_fs_").is_empty());
    assert_eq!(lines_with_prefix(&text, "freebsd_load").len(), 3);
    assert_eq!(lines_with_prefix(&text, "freebsd_netif_").len(), 3);
    assert_eq!(lines_with_prefix(&text, "freebsd_mem_").len(), 9);
    assert_eq!(lines_with_prefix(&text, "freebsd_device_").len(), 2);
}

#[test]
fn test_every_collector_failing_still_succeeds() {
    let host = FakeHost {
        mounts: None,
        load: None,
        interfaces: None,
        devices: None,
        ..FakeHost::default()
    };
    let text = scrape(&host, &Settings::default());

    // Preamble plus memory, which has no whole-collector failure here.
    assert!(text.starts_with("HTTP/1.1 200 OK\r\n"));
    let metric_lines: Vec<&str> = text.lines().filter(|l| l.starts_with("freebsd_")).collect();
    assert_eq!(metric_lines.len(), 9);
    assert!(metric_lines.iter().all(|l| l.starts_with("freebsd_mem_")));
}

#[test]
fn test_idempotent_filesystem_and_load() {
    let host = FakeHost::default();
    let settings = Settings::default();

    let first = scrape(&host, &settings);
    let second = scrape(&host, &settings);
    for prefix in ["freebsd_fs_", "freebsd_load"] {
        assert_eq!(
            lines_with_prefix(&first, prefix),
            lines_with_prefix(&second, prefix)
        );
    }
}

#[test]
fn test_disabled_collectors_and_namespace() {
    let settings = Settings {
        namespace: "bsd".to_string(),
        http_header: false,
        collectors: vec![CollectorKind::Load, CollectorKind::Device],
        ..Settings::default()
    };
    let text = scrape(&FakeHost::default(), &settings);
    assert_eq!(
        text,
        "bsd_load1 0.500000\n\
         bsd_load5 0.750000\n\
         bsd_load15 1.000000\n\
         bsd_device_read_bytes{device=\"ada0\"} 1024\n\
         bsd_device_write_bytes{device=\"ada0\"} 2048\n"
    );
}

#[test]
fn test_swap_is_clamped_end_to_end() {
    let host = FakeHost {
        swap_max_pages: 1_000_000,
        ..FakeHost::default()
    };
    let text = scrape(&host, &Settings::default());
    // 512 pages of 4 KiB, no clamping below the raw total.
    assert!(text.contains("freebsd_mem_swap_size_bytes 2048\n"));
    assert!(text.contains("freebsd_mem_swap_used_bytes 512\n"));
}

#[test]
fn test_single_collector() {
    let host = FakeHost::default();
    let sources = Sources::from_host(&host);
    let collection = exporter::collect(CollectorKind::Network, &sources).unwrap();
    assert_eq!(collection.metrics.len(), 3);
    assert!(collection.skipped.is_empty());
}

#[test]
fn test_broken_config_file_stays_out_of_the_response() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("freebsd-exporter.json");
    std::fs::write(&path, "{ not json").unwrap();

    let (settings, error) = config::settings_or_fallback(&Args::default(), Some(&path));
    assert!(error.is_some());

    let text = scrape(&FakeHost::default(), &settings);
    assert!(text.starts_with("HTTP/1.1 200 OK\r\nContent-Type: text/plain\r\n\r\n"));
    assert!(!text.contains("Invalid JSON"));
    assert!(!text.contains("configuration file"));
}
