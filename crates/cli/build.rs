use std::{env, fs, path::PathBuf};

fn main() {
    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-env-changed=OUT_DIR");

    let out_dir = PathBuf::from(env::var("OUT_DIR").unwrap());
    let completions_dir = out_dir.join("completions");

    fs::create_dir_all(&completions_dir).unwrap();

    let mut cmd = clap::Command::new("corrigo")
        .version(env!("CARGO_PKG_VERSION"))
        .author("Corrigo Contributors")
        .about("Spell-check articles from a page or an RSS feed")
        .arg(clap::arg!(--url <URL> "Article URL or local HTML file").conflicts_with("feed"))
        .arg(clap::arg!(--feed <URL> "RSS or Atom feed whose items are checked one by one").visible_alias("xml"))
        .arg(clap::arg!(--lang <LANGS> "Comma-separated checker languages").default_value("ru,en"))
        .arg(clap::arg!(--options <MASK> "Checker option bitmask").default_value("14"))
        .arg(
            clap::arg!(--format <FORMAT> "Text format sent to the checker")
                .default_value("plain")
                .value_parser(["plain", "html"]),
        )
        .arg(clap::arg!(--"user-agent" <UA> "User-Agent for HTTP requests").visible_alias("uagent"))
        .arg(clap::arg!(--collect "Save articles with repeated-word or capitalization errors to the corpus"))
        .arg(clap::arg!(--timeout <SECS> "HTTP timeout in seconds").default_value("30"))
        .arg(
            clap::arg!(--target <TARGET> "Tag holding article text, as tag[attr=value]")
                .action(clap::ArgAction::Append),
        )
        .arg(
            clap::arg!(--report <FILE> "Report file")
                .default_value("error.html")
                .value_parser(clap::value_parser!(std::path::PathBuf)),
        )
        .arg(
            clap::arg!(--corpus <FILE> "Corpus file")
                .value_parser(clap::value_parser!(std::path::PathBuf)),
        )
        .arg(clap::arg!(--"speller-url" <URL> "Base URL of the speller service"))
        .arg(clap::arg!(-v --verbose "Enable debug logging"));

    clap_complete::generate_to(clap_complete::shells::Bash, &mut cmd, "corrigo", &completions_dir).unwrap();
    clap_complete::generate_to(clap_complete::shells::Zsh, &mut cmd, "corrigo", &completions_dir).unwrap();
    clap_complete::generate_to(clap_complete::shells::Fish, &mut cmd, "corrigo", &completions_dir).unwrap();
    clap_complete::generate_to(clap_complete::shells::PowerShell, &mut cmd, "corrigo", &completions_dir).unwrap();

    println!(
        "cargo:warning=Shell completions generated in: {}",
        completions_dir.display()
    );
}
