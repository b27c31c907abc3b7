use vigil_core::{Analyzer, LanguageId, ParserConfig};

fn main() {
    let source = r#"
        async function greet(name) {
            // wait a beat before answering
            await delay(100);
            return `hello, ${name}`;
        }
    "#;

    let analyzer = match Analyzer::new(ParserConfig::default()) {
        Ok(analyzer) => analyzer,
        Err(e) => {
            eprintln!("Failed to load grammars: {e:?}");
            return;
        }
    };

    match analyzer.analyze(LanguageId::JavaScript, source) {
        Ok(result) => {
            let stats = result.stats();
            println!(
                "{} tokens ({} keywords, {} identifiers), {} issues",
                stats.total, stats.keywords, stats.identifiers, stats.issues
            );
            let json_output = result.to_json().unwrap();
            println!("{json_output}");
        }
        Err(e) => {
            eprintln!("Failed to analyze source: {e:?}");
        }
    }
}
