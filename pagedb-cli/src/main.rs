use std::io::{self, Write};
use std::path::PathBuf;
use std::str::FromStr;

use pagedb::{CrawledPage, DbResult, PageDb, PageDbConfig};
use tracing::info;

fn main() -> DbResult<()> {
    setup_tracing();

    let path: PathBuf = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "ignore/my-pagedb".to_string())
        .into();
    let db = PageDb::open(&path, PageDbConfig::default())?;
    info!(path = %path.display(), pages = db.page_count()?, "opened page database");

    loop {
        println!("Pick a command: `add`, `get`, `links`, `quit`.");
        match &*input::<String>("cmd> ") {
            "add" => {
                let url: String = input("url> ");
                let n_links: u32 = input("number of links> ");
                let mut page = CrawledPage::new(url, unix_time_placeholder());
                for i in 0..n_links {
                    let link_url: String = input(&format!("link[{i}]> "));
                    page = page.add_link(link_url, 1.0);
                }
                let touched = db.add(&page)?;
                println!("ok, touched {} pages", touched.len());
            }
            "get" => {
                let url: String = input("url> ");
                match db.get_info_from_url(&url)? {
                    Some(info) => println!("{info}"),
                    None => println!("no such page"),
                }
            }
            "links" => {
                let idx: u64 = input("page index> ");
                match db.get_links(idx)? {
                    Some(targets) => println!("{targets:?}"),
                    None => println!("no links recorded for that index"),
                }
            }
            "quit" => break,
            _ => println!("invalid option; try again."),
        }
    }

    Ok(())
}

/// This demo has no clock dependency wired in; a real caller supplies the
/// crawl timestamp itself.
fn unix_time_placeholder() -> f64 {
    0.0
}

/// Sets up tracing subscriber.
fn setup_tracing() {
    use tracing_subscriber::{
        fmt::{format::FmtSpan, layer},
        layer::SubscriberExt,
        util::SubscriberInitExt,
        EnvFilter,
    };

    let filter_layer = EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into());
    let fmt_layer = layer().with_span_events(FmtSpan::NEW | FmtSpan::CLOSE);

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(fmt_layer)
        .init();
}

/// Gets a value from stdin, re-prompting on a parse failure.
fn input<T: FromStr>(prompt: &str) -> T {
    let mut buf = String::new();
    loop {
        print!("{prompt}");
        io::stdout().flush().unwrap();
        buf.clear();
        if io::stdin().read_line(&mut buf).unwrap() == 0 {
            println!("\nbye");
            std::process::exit(0);
        }
        match T::from_str(buf.trim()) {
            Ok(val) => break val,
            Err(_) => println!("try again."),
        }
    }
}
