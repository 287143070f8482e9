//! Rendering pairing URIs for out-of-band scanning.

use std::io::Write;

use qrcode::render::unicode;
use qrcode::QrCode;

/// Turns a pairing URI into something a wallet can scan.
///
/// Rendering is best effort: the URI is always published on the `qr_ready`
/// event too, so a failure here never aborts a connect.
pub trait QrRenderer: Send + Sync {
    fn render(&self, uri: &str) -> anyhow::Result<()>;
}

/// Prints a unicode QR code and the raw link to stderr.
#[derive(Debug, Clone, Copy, Default)]
pub struct TerminalQr;

impl TerminalQr {
    /// Dense unicode rendering, two modules per character cell.
    pub fn to_unicode(uri: &str) -> anyhow::Result<String> {
        let code = QrCode::new(uri.as_bytes())
            .map_err(|e| anyhow::anyhow!("Failed to encode pairing URI as QR: {}", e))?;
        Ok(code
            .render::<unicode::Dense1x2>()
            .dark_color(unicode::Dense1x2::Light)
            .light_color(unicode::Dense1x2::Dark)
            .build())
    }
}

impl QrRenderer for TerminalQr {
    fn render(&self, uri: &str) -> anyhow::Result<()> {
        let image = Self::to_unicode(uri)?;
        let rule = "=".repeat(50);
        let mut out = std::io::stderr().lock();
        writeln!(out, "\n🔗 Scan this QR code with your wallet to connect:")?;
        writeln!(out, "{rule}")?;
        writeln!(out, "{image}")?;
        writeln!(out, "{rule}")?;
        writeln!(out, "Or open this link: {uri}\n")?;
        Ok(())
    }
}

/// Renders nothing; for headless embedders that only consume `qr_ready`.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoQr;

impl QrRenderer for NoQr {
    fn render(&self, _uri: &str) -> anyhow::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unicode_rendering_is_square_ish() {
        let image = TerminalQr::to_unicode("wc:abc@2?relay-protocol=irn&symKey=00").unwrap();
        let lines: Vec<&str> = image.lines().collect();
        assert!(lines.len() > 10);
        let width = lines[0].chars().count();
        assert!(lines.iter().all(|l| l.chars().count() == width));
    }

    #[test]
    fn test_oversized_uri_fails_to_encode() {
        let uri = "x".repeat(8000);
        assert!(TerminalQr::to_unicode(&uri).is_err());
    }
}
