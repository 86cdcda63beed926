use serde::{Deserialize, Serialize};

/// A trigger byte pattern and the label shown next to rows that contain it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Command {
    /// Hex digits; spaces and case are not significant.
    pub code: String,
    pub label: String,
}

/// Named snippet the editor can paste into a row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuickInput {
    pub label: String,
    pub code: String,
}

/// On-disk form of a dictionary.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DictionaryFile {
    pub commands: Vec<Command>,
    pub quick_inputs: Vec<QuickInput>,
}

impl From<DictionaryFile> for CommandDictionary {
    fn from(file: DictionaryFile) -> Self {
        CommandDictionary::new(file.commands).with_quick_inputs(file.quick_inputs)
    }
}

/// Command patterns used to split code into rows and to annotate rows.
///
/// Patterns are kept normalised (lowercase, no whitespace) and ordered
/// longest first so the first hit is always the longest match.
#[derive(Debug, Clone, Default)]
pub struct CommandDictionary {
    commands: Vec<Command>,
    quick_inputs: Vec<QuickInput>,
}

impl CommandDictionary {
    pub fn new(commands: impl IntoIterator<Item = Command>) -> Self {
        let mut commands: Vec<Command> = commands
            .into_iter()
            .filter_map(|cmd| {
                let code: String = cmd
                    .code
                    .chars()
                    .filter(|c| !c.is_whitespace())
                    .collect::<String>()
                    .to_ascii_lowercase();
                // patterns must cover whole bytes
                if code.is_empty() || hex::decode(&code).is_err() {
                    log::debug!("ignoring command pattern {:?} ({})", cmd.code, cmd.label);
                    return None;
                }
                Some(Command {
                    code,
                    label: cmd.label,
                })
            })
            .collect();
        commands.sort_by(|a, b| b.code.len().cmp(&a.code.len()));
        Self {
            commands,
            quick_inputs: Vec::new(),
        }
    }

    pub fn with_quick_inputs(mut self, quick_inputs: Vec<QuickInput>) -> Self {
        self.quick_inputs = quick_inputs;
        self
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    /// Longest command whose pattern starts `hex` (lowercase digits).
    pub fn match_prefix(&self, hex: &str) -> Option<&Command> {
        self.commands.iter().find(|cmd| hex.starts_with(cmd.code.as_str()))
    }

    /// Label of the longest pattern occurring anywhere in a row's text.
    pub fn annotate(&self, text: &str) -> Option<&str> {
        let haystack: String = text
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect::<String>()
            .to_ascii_lowercase();
        self.commands
            .iter()
            .find(|cmd| haystack.contains(cmd.code.as_str()))
            .map(|cmd| cmd.label.as_str())
    }

    pub fn quick_inputs(&self) -> &[QuickInput] {
        &self.quick_inputs
    }

    pub fn quick_input(&self, label: &str) -> Option<&str> {
        self.quick_inputs
            .iter()
            .find(|q| q.label == label)
            .map(|q| q.code.as_str())
    }
}
