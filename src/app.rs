//! Line-oriented command interface over a [`Workspace`].

use std::fmt::Write as _;
use std::str::FromStr;
use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use roadmapper_core::{
    Action, CustomColors, EntryId, EntryPatch, EntryShape, Endpoints, FontFamily, FontSize,
    LineStyle, LineThickness, Orientation, RoadmapDocument, RoadmapId,
};
use roadmapper_session::{SessionMode, Workspace};
use roadmapper_sync::{AuthSession, Session};
use tokio::sync::watch;

const HELP: &str = "\
Entries:   add TITLE [| DATE [| DESCRIPTION]]   edit N TITLE [| DATE [| DESCRIPTION]]
           del N   move FROM TO
Roadmap:   title TEXT   theme ID   reset   endpoints START | END
Style:     orientation|font-size|shape|font|line|thickness VALUE   colors none
History:   undo   redo
Roadmaps:  list   show   new   dup   switch N   remove N
Account:   register EMAIL PASSWORD [NAME]   login EMAIL PASSWORD   logout   whoami
Sharing:   share   share-link   unshare   publish   unpublish   exit-view
Other:     help   quit
";

/// What the loop should do after a line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Continue(String),
    Quit,
}

/// A parsed input line
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Help,
    Show,
    List,
    Add(EntryPatch),
    /// 1-based entry position
    Update { index: usize, patch: EntryPatch },
    Delete(usize),
    Move { from: usize, to: usize },
    /// Edits that need nothing resolved against the document
    Apply(Action),
    Undo,
    Redo,
    New,
    Duplicate,
    /// 1-based roadmap position in `list`
    Switch(usize),
    Remove(usize),
    Register {
        email: String,
        password: String,
        name: Option<String>,
    },
    Login { email: String, password: String },
    Logout,
    Whoami,
    Share,
    ShareLink,
    Unshare,
    Publish,
    Unpublish,
    ExitView,
    Quit,
}

fn position(arg: Option<&str>) -> Result<usize> {
    let raw = arg.ok_or_else(|| anyhow!("expected a number"))?;
    let n: usize = raw.parse().with_context(|| format!("'{raw}' is not a number"))?;
    if n == 0 {
        bail!("positions start at 1");
    }
    Ok(n)
}

/// `TITLE | DATE | DESCRIPTION`, blank fields left unset
fn entry_patch(text: &str) -> EntryPatch {
    let mut fields = text.split('|').map(str::trim);
    let mut patch = EntryPatch::default();
    if let Some(title) = fields.next().filter(|f| !f.is_empty()) {
        patch.title = Some(title.to_string());
    }
    if let Some(date) = fields.next().filter(|f| !f.is_empty()) {
        patch.date = Some(date.to_string());
    }
    if let Some(description) = fields.next().filter(|f| !f.is_empty()) {
        patch.description = Some(description.to_string());
    }
    patch
}

fn required<'a>(rest: &'a str, what: &str) -> Result<&'a str> {
    if rest.is_empty() {
        bail!("missing {what}");
    }
    Ok(rest)
}

impl FromStr for Command {
    type Err = anyhow::Error;

    fn from_str(line: &str) -> Result<Self> {
        let line = line.trim();
        let (word, rest) = line.split_once(' ').unwrap_or((line, ""));
        let rest = rest.trim();
        let mut args = rest.split_whitespace();

        let command = match word {
            "help" | "?" => Command::Help,
            "show" => Command::Show,
            "list" | "ls" => Command::List,
            "add" => Command::Add(entry_patch(required(rest, "title")?)),
            "edit" => {
                let (index, fields) = rest.split_once(' ').unwrap_or((rest, ""));
                let patch = entry_patch(fields);
                if patch.is_empty() {
                    bail!("nothing to change");
                }
                Command::Update {
                    index: position(Some(index))?,
                    patch,
                }
            }
            "del" | "delete" => Command::Delete(position(args.next())?),
            "move" => Command::Move {
                from: position(args.next())?,
                to: position(args.next())?,
            },
            "title" => Command::Apply(Action::SetTitle(required(rest, "title")?.to_string())),
            "theme" => Command::Apply(Action::SetTheme(required(rest, "theme")?.to_string())),
            "reset" => Command::Apply(Action::Reset),
            "endpoints" => {
                let (start, end) = rest.split_once('|').unwrap_or((rest, ""));
                Command::Apply(Action::SetEndpoints(Endpoints::labelled(start.trim(), end.trim())))
            }
            "orientation" => Command::Apply(Action::SetOrientation(rest.parse::<Orientation>()?)),
            "font-size" => Command::Apply(Action::SetFontSize(rest.parse::<FontSize>()?)),
            "shape" => Command::Apply(Action::SetEntryShape(rest.parse::<EntryShape>()?)),
            "font" => Command::Apply(Action::SetFontFamily(rest.parse::<FontFamily>()?)),
            "line" => Command::Apply(Action::SetLineStyle(rest.parse::<LineStyle>()?)),
            "thickness" => Command::Apply(Action::SetLineThickness(rest.parse::<LineThickness>()?)),
            "colors" => match rest {
                "none" => Command::Apply(Action::SetCustomColors(None)),
                json => {
                    let colors: CustomColors =
                        serde_json::from_str(json).context("colors take 'none' or a JSON palette")?;
                    Command::Apply(Action::SetCustomColors(Some(colors)))
                }
            },
            "undo" | "u" => Command::Undo,
            "redo" | "r" => Command::Redo,
            "new" => Command::New,
            "dup" | "duplicate" => Command::Duplicate,
            "switch" => Command::Switch(position(args.next())?),
            "remove" => Command::Remove(position(args.next())?),
            "register" => Command::Register {
                email: args.next().ok_or_else(|| anyhow!("missing email"))?.to_string(),
                password: args.next().ok_or_else(|| anyhow!("missing password"))?.to_string(),
                name: Some(args.collect::<Vec<_>>().join(" ")).filter(|n| !n.is_empty()),
            },
            "login" => Command::Login {
                email: args.next().ok_or_else(|| anyhow!("missing email"))?.to_string(),
                password: args.next().ok_or_else(|| anyhow!("missing password"))?.to_string(),
            },
            "logout" => Command::Logout,
            "whoami" => Command::Whoami,
            "share" => Command::Share,
            "share-link" => Command::ShareLink,
            "unshare" => Command::Unshare,
            "publish" => Command::Publish,
            "unpublish" => Command::Unpublish,
            "exit-view" => Command::ExitView,
            "quit" | "exit" | "q" => Command::Quit,
            other => bail!("unknown command '{other}', try 'help'"),
        };
        Ok(command)
    }
}

/// The interactive session: a workspace plus the account it follows
pub struct App {
    workspace: Workspace,
    auth: Arc<dyn AuthSession>,
    sessions: watch::Receiver<Option<Session>>,
}

impl App {
    pub fn new(workspace: Workspace, auth: Arc<dyn AuthSession>) -> Self {
        let sessions = auth.subscribe();
        Self {
            workspace,
            auth,
            sessions,
        }
    }

    /// Open the workspace at `location` and describe what is shown
    pub async fn mount(&mut self, location: Option<&str>) -> Result<String> {
        let session = self.sessions.borrow_and_update().clone();
        self.workspace.mount(location, session).await?;
        Ok(self.render_document())
    }

    pub fn prompt(&self) -> String {
        let mut prompt = format!("[{}", self.workspace.present().title);
        if self.workspace.view_mode().is_read_only() {
            let _ = write!(prompt, " ({})", self.workspace.view_mode());
        }
        if let Some(session) = self.workspace.session() {
            let _ = write!(prompt, " @{}", session.user.email);
        }
        if self.workspace.has_pending_save() || self.workspace.is_saving() {
            prompt.push('*');
        }
        prompt.push_str("]> ");
        prompt
    }

    pub async fn handle_line(&mut self, line: &str) -> Result<Outcome> {
        if line.trim().is_empty() {
            return Ok(Outcome::Continue(String::new()));
        }
        let command: Command = line.parse()?;
        let outcome = self.execute(command).await;
        // Apply sign-in or sign-out even if the command itself failed
        self.follow_session().await?;
        outcome
    }

    async fn follow_session(&mut self) -> Result<()> {
        if !self.sessions.has_changed().unwrap_or(false) {
            return Ok(());
        }
        let session = self.sessions.borrow_and_update().clone();
        self.workspace.handle_session_change(session).await?;
        Ok(())
    }

    pub async fn execute(&mut self, command: Command) -> Result<Outcome> {
        let output = match command {
            Command::Help => HELP.to_string(),
            Command::Show => self.render_document(),
            Command::List => self.render_roadmaps(),
            Command::Add(patch) => self.edit(Action::AddEntry(patch))?,
            Command::Update { index, patch } => {
                let id = self.entry_id(index)?;
                self.edit(Action::UpdateEntry { id, patch })?
            }
            Command::Delete(index) => {
                let id = self.entry_id(index)?;
                self.edit(Action::DeleteEntry(id))?
            }
            Command::Move { from, to } => {
                let mut entries = self.workspace.present().entries.clone();
                if from == 0 || to == 0 || from > entries.len() || to > entries.len() {
                    bail!("positions go up to {}", entries.len());
                }
                let entry = entries.remove(from - 1);
                entries.insert(to - 1, entry);
                self.edit(Action::ReorderEntries(entries))?
            }
            Command::Apply(action) => self.edit(action)?,
            Command::Undo => {
                if !self.workspace.undo()? {
                    bail!("nothing to undo");
                }
                self.render_document()
            }
            Command::Redo => {
                if !self.workspace.redo()? {
                    bail!("nothing to redo");
                }
                self.render_document()
            }
            Command::New => {
                self.workspace.create_new_roadmap().await?;
                self.render_document()
            }
            Command::Duplicate => {
                self.workspace.duplicate_roadmap().await?;
                self.render_document()
            }
            Command::Switch(index) => {
                let id = self.roadmap_id(index)?;
                self.workspace.switch_roadmap(&id)?;
                self.render_document()
            }
            Command::Remove(index) => {
                let id = self.roadmap_id(index)?;
                self.workspace.delete_roadmap(&id).await?;
                self.render_roadmaps()
            }
            Command::Register {
                email,
                password,
                name,
            } => {
                let session = self.auth.register(&email, &password, name.as_deref()).await?;
                format!("registered and signed in as {}\n", session.user.email)
            }
            Command::Login { email, password } => {
                let session = self.auth.login(&email, &password).await?;
                format!("signed in as {}\n", session.user.email)
            }
            Command::Logout => {
                self.auth.logout().await?;
                "signed out\n".to_string()
            }
            Command::Whoami => match (self.workspace.session(), self.workspace.session_mode()) {
                (Some(session), SessionMode::Authenticated) => {
                    format!("{} (synced)\n", session.user.email)
                }
                (Some(session), _) => format!("{} (local only)\n", session.user.email),
                (None, _) => "not signed in\n".to_string(),
            },
            Command::Share => format!("#share={}\n", self.workspace.share_fragment()),
            Command::ShareLink => {
                let token = self.workspace.generate_share_token().await?;
                format!("/share/{token}\n")
            }
            Command::Unshare => {
                self.workspace.revoke_share_token().await?;
                "share link revoked\n".to_string()
            }
            Command::Publish => {
                let roadmap = self.workspace.set_public(true).await?;
                format!("public at /public/{} and /embed/{}\n", roadmap.id, roadmap.id)
            }
            Command::Unpublish => {
                self.workspace.set_public(false).await?;
                "no longer public\n".to_string()
            }
            Command::ExitView => {
                self.workspace.exit_view_mode().await?;
                self.render_document()
            }
            Command::Quit => return Ok(Outcome::Quit),
        };
        Ok(Outcome::Continue(output))
    }

    fn edit(&mut self, action: Action) -> Result<String> {
        if !self.workspace.dispatch(action)? {
            return Ok("no change\n".to_string());
        }
        Ok(self.render_document())
    }

    fn entry_id(&self, index: usize) -> Result<EntryId> {
        self.workspace
            .present()
            .entries
            .get(index.wrapping_sub(1))
            .map(|entry| entry.id.clone())
            .ok_or_else(|| anyhow!("no entry {index}"))
    }

    fn roadmap_id(&self, index: usize) -> Result<RoadmapId> {
        self.workspace
            .roadmaps()
            .get(index.wrapping_sub(1))
            .map(|doc| doc.id.clone())
            .ok_or_else(|| anyhow!("no roadmap {index}"))
    }

    fn render_document(&self) -> String {
        render(self.workspace.present())
    }

    fn render_roadmaps(&self) -> String {
        let mut out = String::new();
        for (i, doc) in self.workspace.roadmaps().iter().enumerate() {
            let marker = if &doc.id == self.workspace.current_id() { '*' } else { ' ' };
            let _ = writeln!(out, "{marker} {}. {} ({} entries)", i + 1, doc.title, doc.entries.len());
        }
        out
    }

    pub async fn shutdown(&mut self) {
        self.workspace.flush().await;
    }
}

fn render(doc: &RoadmapDocument) -> String {
    let style = &doc.style;
    let mut out = format!(
        "{}\n  theme {} | {} | {} text | {} entries | {} font | {} {} line\n",
        doc.title,
        style.theme_id,
        style.orientation,
        style.font_size,
        style.entry_shape,
        style.font_family,
        style.line_thickness,
        style.line_style,
    );
    if !style.endpoints.start.is_empty() || !style.endpoints.end.is_empty() {
        let _ = writeln!(out, "  from '{}' to '{}'", style.endpoints.start, style.endpoints.end);
    }
    for (i, entry) in doc.entries.iter().enumerate() {
        let _ = write!(out, "  {}. {}", i + 1, entry.title);
        if let Some(date) = &entry.date {
            let _ = write!(out, " [{date}]");
        }
        if let Some(description) = &entry.description {
            let _ = write!(out, " - {description}");
        }
        out.push('\n');
    }
    out
}
