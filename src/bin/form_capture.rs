use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context};
use base64::{engine::general_purpose, Engine as _};
use chrono::Utc;
use clap::Parser;
use printpdf::{GeneratePdfOptions, PdfDocument};
use reqwest::header;
use serde::Deserialize;

/// Renders a machine inspection form to a single-page PDF and either saves it
/// locally or posts it to the upload proxy.
#[derive(Debug, Parser)]
#[command(name = "form-capture", version, about)]
struct Args {
    /// Machine type recorded on the form
    #[arg(long)]
    machine_type: String,

    /// Machine number recorded on the form
    #[arg(long)]
    machine_number: String,

    /// Inspection date (YYYY-MM-DD); defaults to today
    #[arg(long)]
    date: Option<String>,

    /// Gang number recorded on the form
    #[arg(long)]
    gang_number: String,

    /// Write the PDF to this path instead of uploading
    #[arg(long, conflicts_with = "upload")]
    out: Option<PathBuf>,

    /// Base URL of the upload proxy, e.g. http://localhost:8080
    #[arg(long)]
    upload: Option<String>,

    /// Send the upload body base64-encoded
    #[arg(long, requires = "upload")]
    base64: bool,
}

#[derive(Debug, Deserialize)]
struct ProxySuccess {
    message: String,
    #[serde(rename = "fileName")]
    file_name: String,
}

#[derive(Debug, Deserialize)]
struct ProxyError {
    error: String,
    #[serde(default)]
    details: serde_json::Value,
}

#[derive(Debug)]
struct FormSheet {
    machine_type: String,
    machine_number: String,
    date: String,
    gang_number: String,
}

impl FormSheet {
    fn from_args(args: &Args) -> anyhow::Result<Self> {
        let sheet = Self {
            machine_type: args.machine_type.trim().to_string(),
            machine_number: args.machine_number.trim().to_string(),
            date: args
                .date
                .clone()
                .unwrap_or_else(|| Utc::now().format("%Y-%m-%d").to_string())
                .trim()
                .to_string(),
            gang_number: args.gang_number.trim().to_string(),
        };

        for (label, value) in [
            ("machine-type", &sheet.machine_type),
            ("machine-number", &sheet.machine_number),
            ("date", &sheet.date),
            ("gang-number", &sheet.gang_number),
        ] {
            if value.is_empty() {
                bail!("required field '{}' is empty", label);
            }
        }

        Ok(sheet)
    }

    fn file_name(&self) -> String {
        sanitize_file_name(&format!(
            "inspection_{}_{}_{}.pdf",
            self.machine_type, self.machine_number, self.date
        ))
    }

    // Plain table markup only; printpdf's HTML renderer does not cope with
    // complex CSS or layouts.
    fn to_html(&self) -> String {
        let mut html = String::new();
        html.push_str(
            "<!DOCTYPE html><html><head><style>body { font-family: sans-serif; }</style></head><body>",
        );
        html.push_str("<h1>Machine Inspection Form</h1>");
        html.push_str("<table>");
        for (label, value) in [
            ("Machine type", &self.machine_type),
            ("Machine number", &self.machine_number),
            ("Date", &self.date),
            ("Gang number", &self.gang_number),
        ] {
            html.push_str(&format!(
                "<tr><td><b>{}</b></td><td>{}</td></tr>",
                label, value
            ));
        }
        html.push_str("</table>");
        html.push_str("</body></html>");
        html
    }

    fn render_pdf(&self) -> anyhow::Result<Vec<u8>> {
        let html = self.to_html();
        let mut warnings = Vec::new();

        let doc = PdfDocument::from_html(
            &html,
            &BTreeMap::new(), // images
            &BTreeMap::new(), // fonts
            &GeneratePdfOptions::default(),
            &mut warnings,
        )
        .map_err(|e| anyhow::anyhow!("failed to render the form sheet: {}", e))?;

        if !warnings.is_empty() {
            eprintln!("PDF generation warnings: {:?}", warnings);
        }

        let bytes = doc.save(&Default::default(), &mut warnings);
        Ok(bytes)
    }
}

fn sanitize_file_name(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '.' || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

async fn upload_to_proxy(
    base_url: &str,
    file_name: &str,
    pdf_bytes: Vec<u8>,
    use_base64: bool,
) -> anyhow::Result<()> {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(30))
        .build()
        .context("failed to build the HTTP client")?;

    let url = format!("{}/api/v1/upload", base_url.trim_end_matches('/'));
    let request = client.post(&url).query(&[("fileName", file_name)]);

    let request = if use_base64 {
        request
            .header("Content-Transfer-Encoding", "base64")
            .header(header::CONTENT_TYPE, "text/plain")
            .body(general_purpose::STANDARD.encode(&pdf_bytes))
    } else {
        request
            .header(header::CONTENT_TYPE, "application/pdf")
            .body(pdf_bytes)
    };

    let response = request.send().await.context("upload request failed")?;
    let status = response.status();
    let text = response
        .text()
        .await
        .context("failed to read the proxy response")?;

    if status.is_success() {
        let success: ProxySuccess =
            serde_json::from_str(&text).context("proxy returned an unexpected response body")?;
        println!("{} ({})", success.message, success.file_name);
        return Ok(());
    }

    match serde_json::from_str::<ProxyError>(&text) {
        Ok(proxy_error) => bail!(
            "upload failed ({}): {} - {}",
            status,
            proxy_error.error,
            proxy_error.details
        ),
        Err(_) => bail!("upload failed ({}): {}", status, text),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    if args.out.is_none() && args.upload.is_none() {
        bail!("nothing to do: pass --out <path> to save locally or --upload <url> to upload");
    }

    let sheet = FormSheet::from_args(&args)?;
    let file_name = sheet.file_name();

    let pdf_bytes = sheet
        .render_pdf()
        .context("could not generate the form PDF")?;

    if let Some(path) = args.out {
        std::fs::write(&path, &pdf_bytes)
            .with_context(|| format!("failed to write {}", path.display()))?;
        println!("Saved {} ({} bytes)", path.display(), pdf_bytes.len());
        return Ok(());
    }

    // conflicts_with + the check above guarantee upload is set here
    let base_url = args.upload.context("missing upload URL")?;
    upload_to_proxy(&base_url, &file_name, pdf_bytes, args.base64).await
}
