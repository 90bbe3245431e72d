mod ui;

use std::{error::Error, io, path::PathBuf, time::Duration};

use clap::{error::ErrorKind, CommandFactory, Parser};
use crossterm::{
    event::{
        DisableMouseCapture, EnableMouseCapture, KeyCode, KeyEvent, KeyModifiers, MouseButton,
        MouseEvent, MouseEventKind,
    },
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    tty::IsTty,
};
use gridtrial::{
    app_dirs::AppDirs,
    clock::{Clock, SystemClock},
    config::{Config, ConfigStore, FileConfigStore},
    driver::TrialDriver,
    export::{self, CsvDirExporter, ExportKind, ResultExporter},
    logging,
    runtime::{AppEvent, CrosstermEventSource, FixedTicker, Runner},
    scoring::TrialRecord,
    sequence,
    session::{Cell, Grid, Mode, SessionConfig},
    survey::{PairChoice, Section, SurveyForm, LIKERT_ITEMS, TLX_FACTORS},
    trial::{Outcome, Phase, SessionReport},
};
use itertools::Itertools;
use ratatui::{
    backend::{Backend, CrosstermBackend},
    layout::Rect,
    Terminal,
};

const TICK_RATE_MS: u64 = 20;

/// grid pointing experiment: countdown, reveal, click, measure
#[derive(Parser, Debug, Clone)]
#[clap(
    version,
    about,
    long_about = "Presents numbered grid targets in a reproducible per-participant order, measures response latency and spatial error, and writes the results as CSV."
)]
pub struct Cli {
    /// participant identifier (positive integer)
    #[clap(short = 'u', long)]
    participant_id: Option<i64>,

    /// session mode: practice loops forever, existing/proposed run one timed pass
    #[clap(short = 'm', long, value_enum, default_value_t = Mode::Practice)]
    mode: Mode,

    /// grid rows (defaults to the saved config, 5 out of the box)
    #[clap(long)]
    rows: Option<u32>,

    /// grid columns (defaults to the saved config, 7 out of the box)
    #[clap(long)]
    cols: Option<u32>,

    /// directory for exported csv files (defaults to the current directory)
    #[clap(short = 'o', long)]
    output_dir: Option<PathBuf>,

    /// skip the workload questionnaire after a timed session
    #[clap(long)]
    no_survey: bool,

    /// print the trial order for this participant and mode, then exit
    #[clap(long)]
    print_order: bool,
}

impl Cli {
    fn grid(&self, cfg: &Config) -> Grid {
        Grid {
            rows: self.rows.unwrap_or(cfg.grid_rows),
            cols: self.cols.unwrap_or(cfg.grid_cols),
        }
    }

    fn session_config(&self, cfg: &Config) -> gridtrial::Result<SessionConfig> {
        let participant_id = self
            .participant_id
            .ok_or(gridtrial::Error::InvalidParticipantId(0))?;
        SessionConfig::new(participant_id, self.mode, self.grid(cfg))
    }

    fn output_dir(&self, cfg: &Config) -> PathBuf {
        self.output_dir
            .clone()
            .or_else(|| cfg.output_dir.clone())
            .unwrap_or_else(AppDirs::default_export_dir)
    }

    fn survey_enabled(&self, cfg: &Config) -> bool {
        !self.no_survey && cfg.survey
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Task,
    Summary,
    Survey,
    Done,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Quit,
}

pub struct App<C: Clock> {
    pub driver: TrialDriver<C>,
    pub screen: Screen,
    pub cursor: Cell,
    pub last_record: Option<TrialRecord>,
    pub report: Option<SessionReport>,
    pub results_path: Option<PathBuf>,
    pub survey: SurveyForm,
    pub survey_item: usize,
    pub survey_path: Option<PathBuf>,
    pub survey_enabled: bool,
    pub status: Option<String>,
    pub viewport: Rect,
    exporter: CsvDirExporter,
}

impl<C: Clock> App<C> {
    pub fn new(config: SessionConfig, clock: C, exporter: CsvDirExporter, survey: bool) -> Self {
        Self {
            driver: TrialDriver::new(config, clock),
            screen: Screen::Task,
            cursor: 1,
            last_record: None,
            report: None,
            results_path: None,
            survey: SurveyForm::new(),
            survey_item: 0,
            survey_path: None,
            survey_enabled: survey,
            status: None,
            viewport: Rect::default(),
            exporter,
        }
    }

    pub fn grid(&self) -> Grid {
        self.driver.config().grid()
    }

    fn start(&mut self) -> gridtrial::Result<()> {
        let outcomes = self.driver.start()?;
        self.apply(outcomes);
        Ok(())
    }

    fn on_tick(&mut self) -> gridtrial::Result<()> {
        let outcomes = self.driver.pump()?;
        self.apply(outcomes);
        Ok(())
    }

    fn apply(&mut self, outcomes: Vec<Outcome>) {
        for outcome in outcomes {
            match outcome {
                Outcome::Recorded(record) => self.last_record = Some(record),
                Outcome::Finished(report) => {
                    self.report = Some(report);
                    self.export_results();
                    self.screen = Screen::Summary;
                }
                Outcome::Aborted => {}
            }
        }
    }

    fn export_results(&mut self) {
        let Some(report) = self.report.as_ref() else {
            return;
        };
        let name = export::file_name(report.mode, report.participant_id, ExportKind::Results);
        match export::result_rows(report).and_then(|rows| self.exporter.export(&name, &rows)) {
            Ok(path) => {
                self.status = None;
                self.results_path = Some(path);
            }
            Err(err) => {
                tracing::error!(error = %err, "result export failed");
                self.status = Some(format!("export failed: {}", err));
            }
        }
    }

    fn export_survey(&mut self) {
        let config = *self.driver.config();
        let name = export::file_name(config.mode(), config.participant_id(), ExportKind::Survey);
        match self
            .survey
            .to_row()
            .and_then(|rows| self.exporter.export(&name, &rows))
        {
            Ok(path) => {
                self.status = None;
                self.survey_path = Some(path);
                self.screen = Screen::Done;
            }
            Err(err) => {
                tracing::error!(error = %err, "survey export failed");
                self.status = Some(format!("export failed: {}", err));
            }
        }
    }

    fn select(&mut self, cell: Cell) -> gridtrial::Result<()> {
        self.cursor = cell;
        let outcomes = self.driver.select(cell)?;
        self.apply(outcomes);
        Ok(())
    }

    fn move_cursor(&mut self, d_row: i64, d_col: i64) {
        let grid = self.grid();
        let (row, col) = grid.position(self.cursor);
        let row = (row as i64 + d_row).clamp(0, grid.rows as i64 - 1) as u32;
        let col = (col as i64 + d_col).clamp(0, grid.cols as i64 - 1) as u32;
        self.cursor = grid.cell_at(row, col);
    }

    fn abort(&mut self) -> gridtrial::Result<Flow> {
        self.driver.abort()?;
        Ok(Flow::Quit)
    }

    fn on_mouse(&mut self, mouse: MouseEvent) -> gridtrial::Result<()> {
        if self.screen != Screen::Task {
            return Ok(());
        }
        if let MouseEventKind::Down(MouseButton::Left) = mouse.kind {
            if let Some(cell) = ui::cell_at(self.grid(), self.viewport, mouse.column, mouse.row) {
                self.select(cell)?;
            }
        }
        Ok(())
    }

    fn on_key(&mut self, key: KeyEvent) -> gridtrial::Result<Flow> {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            return self.abort();
        }

        match self.screen {
            Screen::Task => match key.code {
                KeyCode::Esc => return self.abort(),
                KeyCode::Up | KeyCode::Char('k') => self.move_cursor(-1, 0),
                KeyCode::Down | KeyCode::Char('j') => self.move_cursor(1, 0),
                KeyCode::Left | KeyCode::Char('h') => self.move_cursor(0, -1),
                KeyCode::Right | KeyCode::Char('l') => self.move_cursor(0, 1),
                KeyCode::Enter | KeyCode::Char(' ') => self.select(self.cursor)?,
                _ => {}
            },
            Screen::Summary => match key.code {
                KeyCode::Esc | KeyCode::Char('q') => return Ok(Flow::Quit),
                KeyCode::Char('r') if self.results_path.is_none() => self.export_results(),
                KeyCode::Enter if self.survey_enabled => self.screen = Screen::Survey,
                KeyCode::Enter => self.screen = Screen::Done,
                _ => {}
            },
            Screen::Survey => return Ok(self.on_survey_key(key)),
            Screen::Done => return Ok(Flow::Quit),
        }
        Ok(Flow::Continue)
    }

    fn on_survey_key(&mut self, key: KeyEvent) -> Flow {
        let result = match self.survey.section() {
            Section::Likert | Section::Ratings => {
                let items = if self.survey.section() == Section::Likert {
                    LIKERT_ITEMS.len()
                } else {
                    TLX_FACTORS.len()
                };
                match key.code {
                    KeyCode::Esc => return Flow::Quit,
                    KeyCode::Up | KeyCode::Char('k') => {
                        self.survey_item = self.survey_item.saturating_sub(1);
                        Ok(())
                    }
                    KeyCode::Down | KeyCode::Char('j') => {
                        self.survey_item = (self.survey_item + 1).min(items - 1);
                        Ok(())
                    }
                    KeyCode::Char(c @ '1'..='7') => {
                        let value = c as u8 - b'0';
                        let set = if self.survey.section() == Section::Likert {
                            self.survey.set_likert(self.survey_item, value)
                        } else {
                            self.survey.set_rating(self.survey_item, value)
                        };
                        if set.is_ok() {
                            self.survey_item = (self.survey_item + 1).min(items - 1);
                        }
                        set
                    }
                    KeyCode::Enter => self.survey.next_section().map(|_| self.survey_item = 0),
                    _ => Ok(()),
                }
            }
            Section::Pairwise => match key.code {
                KeyCode::Esc => return Flow::Quit,
                KeyCode::Left | KeyCode::Char('1') => {
                    self.survey.choose(PairChoice::First);
                    Ok(())
                }
                KeyCode::Right | KeyCode::Char('2') => {
                    self.survey.choose(PairChoice::Second);
                    Ok(())
                }
                KeyCode::Backspace => {
                    self.survey.previous_pair();
                    Ok(())
                }
                KeyCode::Enter => self.survey.next_pair().map(|section| {
                    if section == Section::Complete {
                        self.export_survey();
                    }
                }),
                _ => Ok(()),
            },
            Section::Complete => {
                // a failed export leaves us here; Enter retries
                if key.code == KeyCode::Enter {
                    self.export_survey();
                }
                Ok(())
            }
        };

        if let Err(err) = result {
            self.status = Some(err.to_string());
        } else if self.screen == Screen::Survey && self.survey.section() != Section::Complete {
            self.status = None;
        }
        Flow::Continue
    }

    fn is_live(&self) -> bool {
        !matches!(self.driver.state().phase, Phase::Aborted)
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    let _log_guard = AppDirs::log_dir().and_then(|dir| logging::init(&dir));

    let store = FileConfigStore::new();
    let mut cfg = store.load();

    if cli.print_order {
        let session = match cli.session_config(&cfg) {
            Ok(session) => session,
            Err(err) => {
                let mut cmd = Cli::command();
                cmd.error(ErrorKind::ValueValidation, err.to_string()).exit();
            }
        };
        let order = sequence::generate(
            session.participant_id(),
            session.mode(),
            session.total_cells(),
        );
        println!("{}", order.as_slice().iter().join(","));
        return Ok(());
    }

    let session = match cli.session_config(&cfg) {
        Ok(session) => session,
        Err(err) => {
            let hint = cfg
                .last_participant_id
                .map(|id| format!(" (last participant was {})", id))
                .unwrap_or_default();
            let mut cmd = Cli::command();
            cmd.error(ErrorKind::ValueValidation, format!("{}{}", err, hint))
                .exit();
        }
    };

    if !io::stdin().is_tty() {
        let mut cmd = Cli::command();
        cmd.error(ErrorKind::Io, "stdin must be a tty").exit();
    }

    cfg.last_participant_id = Some(session.participant_id());
    if let Err(err) = store.save(&cfg) {
        tracing::warn!(error = %err, "could not save config");
    }

    let exporter = CsvDirExporter::new(cli.output_dir(&cfg));
    tracing::info!(
        participant = session.participant_id(),
        mode = %session.mode(),
        grid = %session.grid(),
        output = %exporter.dir().display(),
        "starting session"
    );

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = App::new(session, SystemClock, exporter, cli.survey_enabled(&cfg));
    let result = run(&mut terminal, &mut app);

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    if let Some(path) = &app.results_path {
        println!("results written to {}", path.display());
    }
    if let Some(path) = &app.survey_path {
        println!("survey written to {}", path.display());
    }
    result
}

fn run<B: Backend, C: Clock>(
    terminal: &mut Terminal<B>,
    app: &mut App<C>,
) -> Result<(), Box<dyn Error>> {
    let runner = Runner::new(
        CrosstermEventSource::new(),
        FixedTicker::new(Duration::from_millis(TICK_RATE_MS)),
    );

    app.start()?;

    loop {
        terminal.draw(|f| {
            app.viewport = f.area();
            f.render_widget(&*app, f.area());
        })?;

        let flow = match runner.step() {
            AppEvent::Tick | AppEvent::Resize => Flow::Continue,
            AppEvent::Mouse(mouse) => {
                app.on_mouse(mouse)?;
                Flow::Continue
            }
            AppEvent::Key(key) => app.on_key(key)?,
        };
        // timers fire even while input keeps arriving
        app.on_tick()?;

        if flow == Flow::Quit || !app.is_live() {
            break;
        }
    }

    Ok(())
}
