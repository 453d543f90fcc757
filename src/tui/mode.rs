// state local to the tui: which practice screen is showing and the last
// status message worth keeping on screen

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Screen {
    Click,
    Recorded,
}

impl Screen {
    pub fn next(self) -> Self {
        match self {
            Screen::Click => Screen::Recorded,
            Screen::Recorded => Screen::Click,
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            Screen::Click => "Click practice",
            Screen::Recorded => "Recorded practice",
        }
    }
}

#[derive(Clone, Debug)]
pub struct TuiState {
    pub screen: Screen,
    pub status: String,
}

impl Default for TuiState {
    fn default() -> Self {
        Self {
            screen: Screen::Click,
            status: String::new(),
        }
    }
}
