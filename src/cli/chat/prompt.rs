use rustyline::{Config, Editor, Result};

pub fn generate_prompt() -> String {
    "> ".to_string()
}

pub fn rl() -> Result<Editor<()>> {
    let config = Config::builder()
        .history_ignore_space(true)
        .history_ignore_dups(true)
        .build();
    Editor::with_config(config)
}
