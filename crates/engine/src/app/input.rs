use crate::math::Vec2;

/// Bindable keyboard actions. Movement is held; the rest fire on press.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputAction {
    MoveUp,
    MoveDown,
    MoveLeft,
    MoveRight,
    Interact,
    OpenInventory,
    Feed,
    Eat,
    ToggleOverlay,
    Quit,
}

const ACTION_COUNT: usize = 10;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct ActionStates {
    down: [bool; ACTION_COUNT],
}

impl ActionStates {
    pub(crate) fn set(&mut self, action: InputAction, is_down: bool) {
        self.down[action.index()] = is_down;
    }

    pub(crate) fn is_down(&self, action: InputAction) -> bool {
        self.down[action.index()]
    }
}

impl InputAction {
    const fn index(self) -> usize {
        match self {
            InputAction::MoveUp => 0,
            InputAction::MoveDown => 1,
            InputAction::MoveLeft => 2,
            InputAction::MoveRight => 3,
            InputAction::Interact => 4,
            InputAction::OpenInventory => 5,
            InputAction::Feed => 6,
            InputAction::ToggleOverlay => 7,
            InputAction::Quit => 8,
            InputAction::Eat => 9,
        }
    }
}

/// A single discrete request from the input source.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Intent {
    Move(Vec2),
    Interact,
    OpenInventory,
    Feed,
    Eat,
    ToggleDebugOverlay,
    Quit,
}

/// All intents for one tick. Later moves replace earlier ones.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct IntentBatch {
    pub movement: Vec2,
    pub interact: bool,
    pub open_inventory: bool,
    pub feed: bool,
    pub eat: bool,
    pub toggle_overlay: bool,
    pub quit: bool,
}

impl IntentBatch {
    pub fn idle() -> Self {
        Self::default()
    }

    pub fn push(&mut self, intent: Intent) {
        match intent {
            Intent::Move(vector) => self.movement = vector,
            Intent::Interact => self.interact = true,
            Intent::OpenInventory => self.open_inventory = true,
            Intent::Feed => self.feed = true,
            Intent::Eat => self.eat = true,
            Intent::ToggleDebugOverlay => self.toggle_overlay = true,
            Intent::Quit => self.quit = true,
        }
    }

    pub fn with(mut self, intent: Intent) -> Self {
        self.push(intent);
        self
    }

    pub fn from_intents(intents: impl IntoIterator<Item = Intent>) -> Self {
        intents.into_iter().fold(Self::idle(), Self::with)
    }

    /// Clears press-once flags so a held key does not repeat across ticks.
    pub(crate) fn take_one_shots(&mut self) -> Self {
        let batch = *self;
        self.interact = false;
        self.open_inventory = false;
        self.feed = false;
        self.eat = false;
        self.toggle_overlay = false;
        batch
    }
}

/// Held-key state plus the press edges seen since the last tick.
#[derive(Debug, Default)]
pub(crate) struct InputCollector {
    held: ActionStates,
    pending: IntentBatch,
}

impl InputCollector {
    pub(crate) fn handle(&mut self, action: InputAction, is_down: bool) {
        let was_down = self.held.is_down(action);
        self.held.set(action, is_down);
        if !is_down || was_down {
            return;
        }
        match action {
            InputAction::Interact => self.pending.push(Intent::Interact),
            InputAction::OpenInventory => self.pending.push(Intent::OpenInventory),
            InputAction::Feed => self.pending.push(Intent::Feed),
            InputAction::Eat => self.pending.push(Intent::Eat),
            InputAction::ToggleOverlay => self.pending.push(Intent::ToggleDebugOverlay),
            InputAction::Quit => self.pending.push(Intent::Quit),
            InputAction::MoveUp
            | InputAction::MoveDown
            | InputAction::MoveLeft
            | InputAction::MoveRight => {}
        }
    }

    /// Screen-relative movement turned into a grid-space vector.
    ///
    /// Up on screen is north-west in grid space, so each arrow maps onto a
    /// diagonal of the grid.
    fn movement(&self) -> Vec2 {
        let mut screen_x = 0.0;
        let mut screen_y = 0.0;
        if self.held.is_down(InputAction::MoveUp) {
            screen_y -= 1.0;
        }
        if self.held.is_down(InputAction::MoveDown) {
            screen_y += 1.0;
        }
        if self.held.is_down(InputAction::MoveLeft) {
            screen_x -= 1.0;
        }
        if self.held.is_down(InputAction::MoveRight) {
            screen_x += 1.0;
        }
        Vec2::new(screen_x + screen_y, screen_y - screen_x).normalized_or_zero()
    }

    /// Batch for the next tick. One-shot intents are handed out once.
    pub(crate) fn next_batch(&mut self) -> IntentBatch {
        self.pending.movement = self.movement();
        self.pending.take_one_shots()
    }

    pub(crate) fn quit_requested(&self) -> bool {
        self.pending.quit
    }
}
