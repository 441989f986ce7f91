use super::*;

#[test]
fn no_command_is_none() {
    let cli = Cli::try_parse_from(["kibble"]).expect("expected valid cli args");
    assert!(cli.command.is_none());
}

#[test]
fn extract_defaults_to_auto_and_fetching() {
    let cli = Cli::try_parse_from(["kibble", "extract", "https://www.zooplus.co.uk/shop/dogs"])
        .unwrap();
    assert!(matches!(
        cli.command,
        Some(Commands::Extract {
            ref url,
            file: None,
            kind: ExtractKind::Auto,
        }) if url == "https://www.zooplus.co.uk/shop/dogs"
    ));
}

#[test]
fn extract_with_file_and_kind() {
    let cli = Cli::try_parse_from([
        "kibble",
        "extract",
        "https://www.tesco.com/groceries/en-GB/products/301234567",
        "--file",
        "page.html",
        "--kind",
        "review",
    ])
    .unwrap();
    assert!(matches!(
        cli.command,
        Some(Commands::Extract {
            file: Some(ref f),
            kind: ExtractKind::Review,
            ..
        }) if f == &PathBuf::from("page.html")
    ));
}

#[test]
fn extract_rejects_unknown_kind() {
    assert!(Cli::try_parse_from(["kibble", "extract", "https://a.test/", "--kind", "sitemap"]).is_err());
}

#[test]
fn fetch_lenient_with_output() {
    let cli = Cli::try_parse_from([
        "kibble",
        "fetch",
        "https://www.jollyes.co.uk/dog/dog-food.html",
        "--lenient",
        "--output",
        "out.html",
    ])
    .unwrap();
    assert!(matches!(
        cli.command,
        Some(Commands::Fetch {
            lenient: true,
            output: Some(_),
            ..
        })
    ));
}

#[test]
fn crawl_takes_many_urls() {
    let cli = Cli::try_parse_from([
        "kibble",
        "crawl",
        "https://www.petsathome.com/product/listing/dog/dog-food",
        "https://www.zooplus.co.uk/shop/cats/dry_cat_food",
        "--max-pages",
        "3",
    ])
    .unwrap();
    assert!(matches!(
        cli.command,
        Some(Commands::Crawl {
            ref urls,
            max_pages: 3,
            dry_run: false,
            events: false,
        }) if urls.len() == 2
    ));
}

#[test]
fn crawl_defaults() {
    let cli = Cli::try_parse_from(["kibble", "crawl", "https://a.test/c", "--dry-run"]).unwrap();
    assert!(matches!(
        cli.command,
        Some(Commands::Crawl {
            max_pages: 10,
            dry_run: true,
            ..
        })
    ));
}

#[test]
fn crawl_requires_a_url() {
    assert!(Cli::try_parse_from(["kibble", "crawl"]).is_err());
}

#[test]
fn parses_check_config() {
    let cli = Cli::try_parse_from(["kibble", "check-config"]).unwrap();
    assert!(matches!(cli.command, Some(Commands::CheckConfig)));
}
