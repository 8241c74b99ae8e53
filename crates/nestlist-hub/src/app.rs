use crossterm::event::{Event, KeyCode, KeyModifiers};
use ratatui::Frame;

use nestlist_core::{keybinds::Action, ui};
use nestlist_tree::NestedListTool;

/// The main application state.
pub struct App {
    tool: NestedListTool,
    /// Whether the app should quit.
    pub should_quit: bool,
}

impl App {
    pub fn new(tool: NestedListTool) -> Self {
        Self {
            tool,
            should_quit: false,
        }
    }

    /// Called every tick to pick up persistence results.
    pub fn tick(&mut self) {
        self.tool.tick();
    }

    /// Handle a terminal event.
    pub fn handle_event(&mut self, event: Event) {
        if let Event::Key(key) = event {
            // Ctrl-c always quits
            if key.code == KeyCode::Char('c') && key.modifiers == KeyModifiers::CONTROL {
                self.should_quit = true;
                return;
            }

            if self.tool.handle_key(key) == Action::Quit {
                self.should_quit = true;
            }
        }
    }

    /// Render the whole screen.
    pub fn render(&self, frame: &mut Frame) {
        let (content_area, status_area) = ui::standard_layout(frame.area());

        self.tool.render(frame, content_area);

        let info = self.tool.status_info();
        ui::render_status_bar(
            frame,
            status_area,
            self.tool.mode(),
            "Nested List",
            &info,
            self.tool.last_error(),
        );
    }

    /// Wait for queued saves, then stop the persistence thread.
    pub fn finish(self) {
        self.tool.finish();
    }
}
