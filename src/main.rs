//! # Folio CLI
//!
//! Usage:
//!   folio input.json -o output.pdf
//!   echo '{ ... }' | folio -o output.pdf
//!   folio --example > sample.json
//!   folio input.json --config config.json --debug

use folio::Config;
use std::env;
use std::fs;
use std::io::{self, Read};

fn main() {
    env_logger::init();
    let args: Vec<String> = env::args().collect();

    if args.iter().any(|a| a == "--example") {
        print!("{}", example_json());
        return;
    }

    let input = if args.len() > 1 && !args[1].starts_with('-') {
        fs::read_to_string(&args[1]).expect("Failed to read input file")
    } else {
        let mut buf = String::new();
        io::stdin()
            .read_to_string(&mut buf)
            .expect("Failed to read stdin");
        buf
    };

    let mut config = match args.windows(2).find(|w| w[0] == "--config") {
        Some(w) => {
            let text = fs::read_to_string(&w[1]).expect("Failed to read config file");
            match Config::from_json(&text) {
                Ok(config) => config,
                Err(e) => {
                    eprintln!("✗ Bad config: {}", e);
                    std::process::exit(1);
                }
            }
        }
        None => Config::default(),
    };
    if args.iter().any(|a| a == "--debug") {
        config.debug = true;
    }

    let output_path = args
        .windows(2)
        .find(|w| w[0] == "-o")
        .map(|w| w[1].clone());

    match folio::render_json(&input, config) {
        Ok(document) => {
            let path = output_path
                .or_else(|| document.filename.clone())
                .unwrap_or_else(|| "output.pdf".to_string());
            fs::write(&path, &document.bytes).expect("Failed to write PDF");
            eprintln!("✓ Written {} bytes to {}", document.bytes.len(), path);
        }
        Err(e) => {
            eprintln!("✗ Render failed: {}", e);
            std::process::exit(1);
        }
    }
}

fn example_json() -> &'static str {
    r##"{
  "head": {
    "tag": "head",
    "children": [
      { "tag": "title", "children": [{ "text": "Quarterly Summary" }] },
      {
        "tag": "meta",
        "children": [
          { "tag": "author", "children": [{ "text": "Folio" }] }
        ]
      },
      {
        "tag": "styles",
        "children": [
          { "tag": "muted", "attrs": { "color": "#666666", "size": 9 } },
          { "tag": "callout", "attrs": { "display": "block", "backgroundColor": "#f4f4f8",
                                         "padding": 10, "marginBottom": 12 } }
        ]
      }
    ]
  },
  "pages": [
    {
      "tag": "page",
      "attrs": { "margin": 54 },
      "children": [
        { "tag": "h1", "children": [{ "text": "Quarterly Summary" }] },
        { "tag": "p", "children": [
          { "text": "Revenue grew in " },
          { "tag": "b", "children": [{ "text": "every region" }] },
          { "text": " this quarter, led by subscriptions." }
        ]},
        { "tag": "hr" },
        { "tag": "row", "children": [
          { "tag": "column", "attrs": { "width": "50%" }, "children": [
            { "tag": "h3", "children": [{ "text": "Highlights" }] },
            { "tag": "p", "children": [{ "text": "Churn fell to a record low." }] }
          ]},
          { "tag": "column", "attrs": { "width": "50%" }, "children": [
            { "tag": "h3", "children": [{ "text": "Risks" }] },
            { "tag": "p", "children": [{ "text": "Infrastructure costs keep climbing." }] }
          ]}
        ]},
        { "tag": "div", "attrs": { "style": "callout" }, "children": [
          { "tag": "p", "children": [{ "text": "Full figures ship with the annual report." }] }
        ]},
        { "tag": "p", "attrs": { "style": "muted" }, "children": [
          { "text": "Questions? Visit " },
          { "tag": "a", "children": [{ "text": "example.com/reports" }] }
        ]}
      ]
    }
  ]
}"##
}
