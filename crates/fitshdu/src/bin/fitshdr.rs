use std::process::ExitCode;

use clap::Parser;
use fitshdu::{FitsFile, Hdu, HduType, OpenMode, ReadsKey, CARD_SIZE};
use tracing::error;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// List the HDUs of a FITS file or dump the header of one of them.
#[derive(Parser, Debug)]
#[command(name = "fitshdr")]
#[command(version, about, long_about = None)]
struct Args {
    /// FITS file, optionally with a `[n]` or `[NAME, ver]` HDU selector.
    file: String,

    /// HDU to select: a 1-based number or an EXTNAME.
    #[arg(long)]
    hdu: Option<String>,

    /// Print the header records of the selected HDU instead of a summary.
    #[arg(long)]
    header: bool,

    /// Enable debug logging.
    #[arg(short, long)]
    verbose: bool,
}

fn init_logging(verbose: bool) {
    let default_filter = if verbose {
        "fitshdu=debug,fitshdr=debug"
    } else {
        "fitshdu=info,fitshdr=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn type_label(hdu: &Hdu, number: usize) -> &'static str {
    match hdu.hdu_type() {
        HduType::Image if number == 1 => "Primary",
        HduType::Image if hdu.is_compressed_image() => "Compressed image",
        HduType::Image => "IMAGE extension",
        HduType::AsciiTable => "TABLE extension",
        HduType::BinaryTable => "BINTABLE extension",
    }
}

fn format_hdu(number: usize, hdu: &Hdu) -> String {
    let mut out = format!("HDU {}: {}", number, type_label(hdu, number));
    if let Some(name) = hdu.name() {
        out.push_str(&format!(" (EXTNAME: {}, EXTVER: {})", name, hdu.version()));
    }
    out.push('\n');

    match hdu.hdu_type() {
        HduType::Image => {
            let bitpix_key = if hdu.is_compressed_image() { "ZBITPIX" } else { "BITPIX" };
            if let Ok(bitpix) = i64::read_key(hdu, bitpix_key) {
                out.push_str(&format!("  BITPIX: {}\n", bitpix));
            }
            let naxes = hdu.naxes();
            out.push_str(&format!("  NAXIS: {}\n", naxes.len()));
            if !naxes.is_empty() {
                out.push_str(&format!("  Dimensions: {:?}\n", naxes));
            }
        }
        HduType::AsciiTable | HduType::BinaryTable => {
            let naxes = hdu.naxes();
            if let Ok(tfields) = i64::read_key(hdu, "TFIELDS") {
                out.push_str(&format!("  Columns: {}\n", tfields));
            }
            if let [width, rows] = naxes[..] {
                out.push_str(&format!("  Rows: {}\n", rows));
                out.push_str(&format!("  Row width: {} bytes\n", width));
            }
        }
    }
    out.push_str(&format!("  Header cards: {}\n", hdu.cards().len()));
    out.push_str(&format!("  Data size: {} bytes\n", hdu.data_len));
    out
}

fn format_header(text: &[u8]) -> String {
    let mut out = String::with_capacity(text.len() + text.len() / CARD_SIZE);
    for record in text.chunks(CARD_SIZE) {
        out.push_str(String::from_utf8_lossy(record).trim_end());
        out.push('\n');
    }
    out
}

fn run(args: &Args) -> fitshdu::Result<String> {
    let mut file = FitsFile::open(&args.file, OpenMode::ReadOnly)?;
    if let Some(selector) = &args.hdu {
        match selector.trim().parse::<i64>() {
            Ok(n) => file.mov_abs_hdu(n)?,
            Err(_) => file.mov_nam_hdu(None, selector, 0)?,
        };
    }

    let out = if args.header {
        format_header(&file.current_hdu().header_text())
    } else if args.hdu.is_some() || args.file.ends_with(']') {
        format_hdu(file.hdu_num(), file.current_hdu())
    } else {
        file.hdus()
            .iter()
            .enumerate()
            .map(|(i, hdu)| format_hdu(i + 1, hdu))
            .collect::<Vec<_>>()
            .join("\n")
    };
    file.close()?;
    Ok(out)
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(args.verbose);

    match run(&args) {
        Ok(output) => {
            print!("{}", output);
            ExitCode::SUCCESS
        }
        Err(err) => {
            error!(file = %args.file, status = err.status(), "{}", err);
            ExitCode::FAILURE
        }
    }
}
