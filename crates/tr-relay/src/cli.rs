//! CLI (Command Line Interface) mode
//!
//! An interactive REPL bound to a single local session, driven through the
//! same dialogue controller as the HTTP server.

use std::borrow::Cow;

use nu_ansi_term::{Color, Style};
use reedline::{
    ColumnarMenu, Completer, DefaultHinter, Emacs, KeyCode, KeyModifiers, Keybindings, MenuBuilder,
    Prompt, PromptEditMode, PromptHistorySearch, Reedline, ReedlineEvent, ReedlineMenu, Signal,
    Suggestion,
};
use tracing::info;

use tr_core::{DialogueController, DialogueError, Role};

/// Session id used for the local REPL
const CLI_SESSION_ID: &str = "cli";

/// Available commands for autocomplete display
const COMMANDS: &[(&str, &str)] = &[
    ("/help", "Show help"),
    ("/exit", "Exit the program"),
    ("/quit", "Exit the program"),
    ("/clear", "Clear conversation history"),
    ("/history", "Show conversation history"),
];

/// Command completer for reedline
#[derive(Clone)]
pub struct CommandCompleter {
    commands: Vec<(&'static str, &'static str)>,
}

impl CommandCompleter {
    pub fn new() -> Self {
        Self {
            commands: COMMANDS.to_vec(),
        }
    }
}

impl Default for CommandCompleter {
    fn default() -> Self {
        Self::new()
    }
}

impl Completer for CommandCompleter {
    fn complete(&mut self, line: &str, pos: usize) -> Vec<Suggestion> {
        if !line.starts_with('/') {
            return Vec::new();
        }

        self.commands
            .iter()
            .filter(|(cmd, _)| cmd.starts_with(line))
            .map(|(cmd, desc)| Suggestion {
                value: cmd.to_string(),
                description: Some(desc.to_string()),
                extra: None,
                span: reedline::Span::new(0, pos),
                append_whitespace: true,
                style: None,
            })
            .collect()
    }
}

/// Custom prompt with colored styling
struct ColoredPrompt {
    style: Style,
}

impl ColoredPrompt {
    fn new() -> Self {
        Self {
            style: Color::Cyan.bold(),
        }
    }
}

impl Prompt for ColoredPrompt {
    fn render_prompt_left(&self) -> Cow<'_, str> {
        Cow::Owned(self.style.paint("> ").to_string())
    }

    fn render_prompt_right(&self) -> Cow<'_, str> {
        Cow::Borrowed("")
    }

    fn render_prompt_indicator(&self, _prompt_mode: PromptEditMode) -> Cow<'_, str> {
        Cow::Borrowed("")
    }

    fn render_prompt_multiline_indicator(&self) -> Cow<'_, str> {
        Cow::Borrowed("")
    }

    fn render_prompt_history_search_indicator(&self, _history_search: PromptHistorySearch) -> Cow<'_, str> {
        Cow::Borrowed("")
    }
}

/// A slash command entered at the prompt
#[derive(Debug, PartialEq, Eq)]
enum Command {
    Exit,
    Clear,
    Help,
    History,
    Unknown(String),
}

/// Parse `input` as a slash command; `None` means it is a chat message
fn parse_command(input: &str) -> Option<Command> {
    let lower = input.trim().to_lowercase();
    match lower.as_str() {
        "/exit" | "/quit" | "/q" => Some(Command::Exit),
        "/clear" => Some(Command::Clear),
        "/help" | "/?" => Some(Command::Help),
        "/history" => Some(Command::History),
        _ if lower.starts_with('/') => Some(Command::Unknown(input.trim().to_string())),
        _ => None,
    }
}

/// Run CLI interactive mode
pub async fn run_cli(controller: DialogueController) -> anyhow::Result<()> {
    let context = controller.start_session(CLI_SESSION_ID).await?;
    info!("Starting CLI mode for domain: {}", context.domain);

    print_welcome(&context.domain, controller.is_configured());

    let mut keybindings = default_keybindings();
    // Trigger completion on '/' key
    keybindings.add_binding(
        KeyModifiers::NONE,
        KeyCode::Char('/'),
        ReedlineEvent::Edit(vec![reedline::EditCommand::Complete]),
    );

    let menu = Box::new(
        ColumnarMenu::default()
            .with_name("command_menu")
            .with_columns(1)
            .with_column_width(Some(40))
            .with_only_buffer_difference(false),
    );

    let hinter = DefaultHinter::default().with_style(Style::new().dimmed());

    let mut line_editor = Reedline::create()
        .with_completer(Box::new(CommandCompleter::new()))
        .with_menu(ReedlineMenu::EngineCompleter(menu))
        .with_hinter(Box::new(hinter))
        .with_edit_mode(Box::new(Emacs::new(keybindings)));

    let prompt = ColoredPrompt::new();

    loop {
        match line_editor.read_line(&prompt) {
            Ok(Signal::Success(line)) => {
                let input = line.trim();
                if input.is_empty() {
                    continue;
                }

                match parse_command(input) {
                    Some(Command::Exit) => {
                        println!("\nGoodbye!\n");
                        break;
                    }
                    Some(Command::Clear) => match controller.clear_session(CLI_SESSION_ID).await {
                        Ok(_) => println!("\nConversation history cleared.\n"),
                        Err(e) => print_error(&e),
                    },
                    Some(Command::Help) => print_help(),
                    Some(Command::History) => print_history(&controller).await,
                    Some(Command::Unknown(cmd)) => {
                        eprintln!("\nUnknown command: {}. Type /help for the command list.\n", cmd);
                    }
                    None => match controller.send_message(CLI_SESSION_ID, input).await {
                        Ok(response) => println!("\n{}\n", response),
                        Err(e) => print_error(&e),
                    },
                }
            }
            Ok(Signal::CtrlC) => {
                println!("^C");
                continue;
            }
            Ok(Signal::CtrlD) => {
                println!("\nGoodbye!\n");
                break;
            }
            Err(err) => {
                eprintln!("\nError: {}\n", err);
                break;
            }
        }
    }

    Ok(())
}

/// Default keybindings for reedline
fn default_keybindings() -> Keybindings {
    let mut keybindings = Keybindings::new();
    keybindings.add_binding(
        KeyModifiers::NONE,
        KeyCode::Tab,
        ReedlineEvent::Edit(vec![reedline::EditCommand::Complete]),
    );
    keybindings.add_binding(KeyModifiers::NONE, KeyCode::Enter, ReedlineEvent::Submit);
    keybindings.add_binding(KeyModifiers::NONE, KeyCode::Esc, ReedlineEvent::Esc);
    keybindings.add_binding(KeyModifiers::CONTROL, KeyCode::Char('c'), ReedlineEvent::CtrlC);
    keybindings.add_binding(KeyModifiers::CONTROL, KeyCode::Char('d'), ReedlineEvent::CtrlD);
    keybindings.add_binding(KeyModifiers::NONE, KeyCode::Up, ReedlineEvent::Up);
    keybindings.add_binding(KeyModifiers::NONE, KeyCode::Down, ReedlineEvent::Down);
    keybindings
}

fn print_error(error: &DialogueError) {
    eprintln!("\n{} {}\n", Color::Red.bold().paint("Error:"), error);
}

fn print_welcome(domain: &str, configured: bool) {
    let title = Color::Cyan.bold();
    println!();
    println!("{}", title.paint(format!("AI chat - domain: {}", domain)));
    println!("Type /help for commands, Ctrl+D to exit.");
    if !configured {
        println!(
            "{}",
            Color::Yellow.paint("Warning: no provider API key configured; messages will fail.")
        );
    }
    println!();
}

fn print_help() {
    println!();
    println!("Commands:");
    for (cmd, desc) in COMMANDS {
        println!("  {:<10} {}", cmd, desc);
    }
    println!();
}

async fn print_history(controller: &DialogueController) {
    match controller.history(CLI_SESSION_ID).await {
        Ok(Some(history)) if !history.is_fresh() => {
            println!();
            // Skip the system seed
            for message in &history.messages()[1..] {
                let label = match message.role {
                    Role::User => Color::Green.bold().paint("you"),
                    Role::Assistant => Color::Cyan.bold().paint("assistant"),
                    Role::System => Color::DarkGray.paint("system"),
                };
                println!("{}: {}", label, message.content);
            }
            println!();
        }
        Ok(_) => println!("\nNo messages yet.\n"),
        Err(e) => print_error(&e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_command() {
        assert_eq!(parse_command("/exit"), Some(Command::Exit));
        assert_eq!(parse_command("/QUIT"), Some(Command::Exit));
        assert_eq!(parse_command("/clear"), Some(Command::Clear));
        assert_eq!(parse_command("/?"), Some(Command::Help));
        assert_eq!(parse_command("/history"), Some(Command::History));
        assert_eq!(parse_command("/foo"), Some(Command::Unknown("/foo".to_string())));
        assert_eq!(parse_command("What is a decorator?"), None);
    }

    #[test]
    fn test_completer_filters_by_prefix() {
        let mut completer = CommandCompleter::new();
        let suggestions = completer.complete("/h", 2);
        let values: Vec<_> = suggestions.iter().map(|s| s.value.as_str()).collect();
        assert_eq!(values, vec!["/help", "/history"]);
        assert!(completer.complete("hello", 5).is_empty());
    }
}
