//! Exposition-format rendering.
//!
//! The family builders turn already-final values into [`Metric`] records with
//! the fixed naming scheme; [`Renderer`] prints them as
//! `<namespace>_<name>{label="value",...} <value>` lines.
//!
//! Label values are written verbatim. Embedded quotes or backslashes are not
//! escaped.

use std::io::{self, Write};

use crate::metric::Metric;

/// HTTP status line and content type written before the metric body.
pub const HTTP_PREAMBLE: &str = "HTTP/1.1 200 OK\r\nContent-Type: text/plain\r\n\r\n";

/// Writes the transport preamble for inetd-style operation.
pub fn write_http_preamble<W: Write>(out: &mut W) -> io::Result<()> {
    out.write_all(HTTP_PREAMBLE.as_bytes())
}

/// Prints metric records under a namespace prefix.
#[derive(Debug, Clone, Copy)]
pub struct Renderer<'a> {
    namespace: &'a str,
}

impl<'a> Renderer<'a> {
    pub fn new(namespace: &'a str) -> Self {
        Self { namespace }
    }

    /// Writes exactly one line for `metric`.
    pub fn write<W: Write>(&self, out: &mut W, metric: &Metric) -> io::Result<()> {
        write!(out, "{}_{}", self.namespace, metric.name())?;

        if !metric.labels().is_empty() {
            out.write_all(b"{")?;
            for (idx, (key, value)) in metric.labels().iter().enumerate() {
                if idx > 0 {
                    out.write_all(b",")?;
                }
                write!(out, "{}=\"{}\"", key, value)?;
            }
            out.write_all(b"}")?;
        }

        writeln!(out, " {}", metric.value())
    }

    pub fn write_all<W: Write>(&self, out: &mut W, metrics: &[Metric]) -> io::Result<()> {
        for metric in metrics {
            self.write(out, metric)?;
        }
        Ok(())
    }
}

/// `fs_{size,used,free}_bytes` labelled by device, type and mountpoint.
pub fn filesystem(
    device: &str,
    fstype: &str,
    mountpoint: &str,
    size: u64,
    used: u64,
    free: i64,
) -> [Metric; 3] {
    let labelled = |metric: Metric| {
        metric
            .with_label("device", device)
            .with_label("type", fstype)
            .with_label("mountpoint", mountpoint)
    };

    [
        labelled(Metric::new("fs_size_bytes", size)),
        labelled(Metric::new("fs_used_bytes", used)),
        labelled(Metric::new("fs_free_bytes", free)),
    ]
}

/// `load1`, `load5` and `load15`.
pub fn load_average(one: f64, five: f64, fifteen: f64) -> [Metric; 3] {
    [
        Metric::new("load1", one),
        Metric::new("load5", five),
        Metric::new("load15", fifteen),
    ]
}

/// `netif_{rx_bytes,tx_bytes,errors}` labelled by interface.
pub fn network_interface(
    interface: &str,
    rx_bytes: u64,
    tx_bytes: u64,
    errors: u64,
) -> [Metric; 3] {
    [
        Metric::new("netif_rx_bytes", rx_bytes).with_label("interface", interface),
        Metric::new("netif_tx_bytes", tx_bytes).with_label("interface", interface),
        Metric::new("netif_errors", errors).with_label("interface", interface),
    ]
}

/// `mem_<field>_bytes` without labels.
pub fn memory(field: &str, value: u64) -> Metric {
    Metric::new(format!("mem_{}_bytes", field), value)
}

/// `device_{read,write}_bytes` labelled by device identifier.
pub fn device_io(device: &str, read_bytes: u64, write_bytes: u64) -> [Metric; 2] {
    [
        Metric::new("device_read_bytes", read_bytes).with_label("device", device),
        Metric::new("device_write_bytes", write_bytes).with_label("device", device),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(metrics: &[Metric]) -> String {
        let mut out = Vec::new();
        Renderer::new("freebsd")
            .write_all(&mut out, metrics)
            .expect("writing to a Vec cannot fail");
        String::from_utf8(out).expect("rendered output is UTF-8")
    }

    #[test]
    fn test_filesystem_lines() {
        let text = render(&filesystem("/dev/ada0p2", "ufs", "/", 512000, 409600, 76800));
        assert_eq!(
            text,
            "freebsd_fs_size_bytes{device=\"/dev/ada0p2\",type=\"ufs\",mountpoint=\"/\"} 512000\n\
             freebsd_fs_used_bytes{device=\"/dev/ada0p2\",type=\"ufs\",mountpoint=\"/\"} 409600\n\
             freebsd_fs_free_bytes{device=\"/dev/ada0p2\",type=\"ufs\",mountpoint=\"/\"} 76800\n"
        );
    }

    #[test]
    fn test_unlabelled_lines() {
        let text = render(&load_average(0.5, 0.75, 1.0));
        assert_eq!(
            text,
            "freebsd_load1 0.500000\nfreebsd_load5 0.750000\nfreebsd_load15 1.000000\n"
        );

        let text = render(&[memory("swap_size", 2048)]);
        assert_eq!(text, "freebsd_mem_swap_size_bytes 2048\n");
    }

    #[test]
    fn test_network_and_device_lines() {
        let text = render(&network_interface("em0", 1000, 2000, 3));
        assert!(text.contains("freebsd_netif_rx_bytes{interface=\"em0\"} 1000\n"));
        assert!(text.contains("freebsd_netif_tx_bytes{interface=\"em0\"} 2000\n"));
        assert!(text.contains("freebsd_netif_errors{interface=\"em0\"} 3\n"));

        let text = render(&device_io("ada0", 4096, 0));
        assert_eq!(
            text,
            "freebsd_device_read_bytes{device=\"ada0\"} 4096\nfreebsd_device_write_bytes{device=\"ada0\"} 0\n"
        );
    }

    #[test]
    fn test_label_values_are_not_escaped() {
        let text = render(&device_io("we\"ird", 1, 1));
        assert!(text.starts_with("freebsd_device_read_bytes{device=\"we\"ird\"} 1"));
    }

    #[test]
    fn test_custom_namespace() {
        let mut out = Vec::new();
        Renderer::new("node")
            .write(&mut out, &memory("free", 4096))
            .unwrap();
        assert_eq!(out, b"node_mem_free_bytes 4096\n");
    }

    #[test]
    fn test_http_preamble() {
        let mut out = Vec::new();
        write_http_preamble(&mut out).unwrap();
        assert_eq!(out, b"HTTP/1.1 200 OK\r\nContent-Type: text/plain\r\n\r\n");
    }
}
