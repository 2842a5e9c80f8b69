use core_types::Language;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Send(String),
    SetLanguage(Language),
    Configure {
        credential: String,
        knowledge_source_ref: Option<String>,
    },
    TestConnection,
    AutoSpeak(bool),
    Handoff,
    Samples,
    Voice,
    Help,
    Quit,
    Empty,
    Invalid(String),
}

pub const HELP: &str = "\
/lang <en|hi|mr|te|ta>        switch reply language
/configure <api-key> [doc]    save the AI key and optional knowledge document link
/test                         test the AI connection
/autospeak <on|off>           read replies aloud
/handoff                      ask for a human assistant
/samples                      show quick queries
/voice                        show voice status
/quit                         exit";

pub fn parse(line: &str) -> Command {
    let line = line.trim();
    if line.is_empty() {
        return Command::Empty;
    }
    let Some(rest) = line.strip_prefix('/') else {
        return Command::Send(line.to_string());
    };

    let mut parts = rest.split_whitespace();
    let name = parts.next().unwrap_or_default();
    let args: Vec<&str> = parts.collect();
    match (name, args.as_slice()) {
        ("lang", [code]) => match Language::from_code(code) {
            Some(language) => Command::SetLanguage(language),
            None => Command::Invalid(format!("unknown language `{code}`")),
        },
        ("configure", [credential]) => Command::Configure {
            credential: credential.to_string(),
            knowledge_source_ref: None,
        },
        ("configure", [credential, source]) => Command::Configure {
            credential: credential.to_string(),
            knowledge_source_ref: Some(source.to_string()),
        },
        ("test", []) => Command::TestConnection,
        ("autospeak", ["on"]) => Command::AutoSpeak(true),
        ("autospeak", ["off"]) => Command::AutoSpeak(false),
        ("handoff", []) => Command::Handoff,
        ("samples", []) => Command::Samples,
        ("voice", []) => Command::Voice,
        ("help", []) => Command::Help,
        ("quit" | "exit", []) => Command::Quit,
        _ => Command::Invalid(format!("unrecognized command `/{rest}`")),
    }
}
