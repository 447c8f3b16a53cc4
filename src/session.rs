//! Game session
//!
//! Owns the round simulation, the market, the player profile and the
//! scheduler handles that drive them. A host calls [`Session::start`] once,
//! then [`Session::update`] as often as it likes (typically once per display
//! refresh), and [`Session::stop`] on teardown. Every call returns the events
//! it produced; sound, notifications and drawing are left to the caller.

use rand::SeedableRng;
use rand_pcg::Pcg32;
use serde::Serialize;

use crate::commentary::{self, CommentaryError, Commentator};
use crate::duel::{DUEL_TICK_MS, Duel, DuelEvent, DuelStatus};
use crate::highscores::{BoardRow, HighScores, global_leaderboard};
use crate::market::{Catalog, ListingId, Market, MarketError, MarketEvent};
use crate::persistence::{BackupEnvelope, BackupSink, SaveDebouncer, load_profile, save_profile};
use crate::platform::storage::KeyValueStore;
use crate::platform::time::Clock;
use crate::profile::Profile;
use crate::reward::{self, SkinMinter};
use crate::scheduler::{FrameLoop, IntervalTimer};
use crate::settings::Settings;
use crate::sim::{self, FrameSnapshot, GameEvent, GamePhase, GameState, TickInput};
use crate::themes::{self, DEFAULT_THEME, Theme};

/// Everything a session step can report
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum SessionEvent {
    Game(GameEvent),
    Market(MarketEvent),
    Duel(DuelEvent),
    /// Score converted into coins at round end
    CoinsEarned { amount: u64 },
    NewHighScore { score: u32 },
    /// Placement on the local leaderboard (1-indexed)
    LeaderboardRank { rank: usize },
    ThemeChanged { theme: &'static str },
    SkinUnlocked { skin_id: String },
    /// The round ended; commentary for this score may now be fetched
    CommentaryRequested { score: u32 },
    /// The score earns a unique skin; mint it before fetching commentary
    SkinMintRequested { score: u32 },
    UniqueSkinMinted { skin_id: String, name: String },
    Saved,
    SaveFailed { error: String },
    BackedUp,
    BackupFailed { error: String },
}

pub struct Session {
    settings: Settings,
    catalog: Catalog,
    profile: Profile,
    market: Market,
    game: GameState,
    theme: &'static Theme,
    high_scores: HighScores,
    duel: Option<Duel>,
    commentary: Option<String>,
    /// Set at round end when the score earns a unique skin
    reward_pending: bool,
    minted: u32,
    /// Leaderboard changed since the last flush
    leaderboard_dirty: bool,

    frames: FrameLoop,
    market_timer: IntervalTimer,
    duel_timer: IntervalTimer,
    pending: TickInput,

    round_rng: Pcg32,
    /// Market and duel rolls; kept apart so timers never perturb pipe layout
    timer_rng: Pcg32,

    clock: Box<dyn Clock>,
    store: Box<dyn KeyValueStore>,
    backup: Option<Box<dyn BackupSink>>,
    saver: SaveDebouncer,
}

impl Session {
    /// Create a session, reading the profile and leaderboard from `store`
    pub fn new(
        settings: Settings,
        clock: Box<dyn Clock>,
        store: Box<dyn KeyValueStore>,
        seed: u64,
    ) -> Self {
        let profile = load_profile(store.as_ref());
        let high_scores = HighScores::load(store.as_ref());
        let game = GameState::new(settings.physics.clone(), themes::milestone_thresholds());
        let market = Market::new(settings.market.clone());
        let market_timer = IntervalTimer::new(settings.market.tick_ms);
        let saver = SaveDebouncer::new(settings.save_debounce_ms);

        let mut catalog = Catalog::standard();
        for skin in profile.custom_skins.values() {
            catalog.insert(skin.clone());
        }

        Self {
            catalog,
            profile,
            market,
            game,
            theme: default_theme(),
            high_scores,
            duel: None,
            commentary: None,
            reward_pending: false,
            minted: 0,
            leaderboard_dirty: false,
            frames: FrameLoop::default(),
            market_timer,
            duel_timer: IntervalTimer::new(DUEL_TICK_MS),
            pending: TickInput::default(),
            round_rng: Pcg32::seed_from_u64(seed),
            timer_rng: Pcg32::seed_from_u64(seed.wrapping_add(1)),
            clock,
            store,
            backup: None,
            saver,
            settings,
        }
    }

    /// Create a session with settings read from `store` as well
    pub fn load(clock: Box<dyn Clock>, store: Box<dyn KeyValueStore>, seed: u64) -> Self {
        let settings = Settings::load(store.as_ref());
        Self::new(settings, clock, store, seed)
    }

    /// Ship a backup envelope to `sink` after every save (needs a username)
    pub fn with_backup(mut self, sink: Box<dyn BackupSink>) -> Self {
        self.backup = Some(sink);
        self
    }

    // === Lifecycle ===

    /// Arm the frame loop and timers and seed an empty market
    pub fn start(&mut self) -> Vec<SessionEvent> {
        let now = self.clock.now_ms();
        self.frames.start(now);
        self.market_timer.start(now);
        self.duel_timer.start(now);
        log::info!("Session started");
        self.market
            .seed(&self.catalog, now, &mut self.timer_rng)
            .into_iter()
            .map(SessionEvent::Market)
            .collect()
    }

    /// Release every scheduler handle and flush a pending save
    pub fn stop(&mut self) -> Vec<SessionEvent> {
        self.frames.stop();
        self.market_timer.stop();
        self.duel_timer.stop();
        log::info!("Session stopped");
        let mut events = Vec::new();
        if self.saver.is_pending() {
            self.saver.cancel();
            self.flush(self.clock.now_ms(), &mut events);
        }
        events
    }

    pub fn is_running(&self) -> bool {
        self.frames.is_running()
    }

    /// Run every frame, market tick, duel tick and save that is due
    pub fn update(&mut self) -> Vec<SessionEvent> {
        let now = self.clock.now_ms();
        let mut events = Vec::new();

        for _ in 0..self.frames.poll(now) {
            let input = std::mem::take(&mut self.pending);
            let step = sim::tick(&mut self.game, &input, &mut self.round_rng);
            self.apply_game_events(step, now, &mut events);
        }

        for _ in 0..self.market_timer.poll(now) {
            let step = self
                .market
                .tick(now, &self.catalog, &mut self.profile, &mut self.timer_rng);
            if step.iter().any(MarketEvent::touches_profile) {
                self.saver.mark_dirty(now);
            }
            events.extend(step.into_iter().map(SessionEvent::Market));
        }

        let duel_ticks = self.duel_timer.poll(now);
        if let Some(duel) = &mut self.duel {
            if let Some(event) = duel.poll_accept(now) {
                log::info!("{} accepted the duel", duel.opponent_name);
                events.push(SessionEvent::Duel(event));
            }
            if self.game.is_playing() {
                for _ in 0..duel_ticks {
                    if let Some(event) = duel.tick(&mut self.timer_rng) {
                        events.push(SessionEvent::Duel(event));
                    }
                }
            }
        }

        if self.saver.poll(now) {
            self.flush(now, &mut events);
        }

        events
    }

    // === Round commands ===

    /// Start -> Playing
    pub fn begin(&mut self) -> Vec<SessionEvent> {
        let step = sim::begin(&mut self.game);
        if step.is_empty() {
            return Vec::new();
        }
        let mut events = self.reset_round_presentation();
        let now = self.clock.now_ms();

        // Only an accepted duel survives into the round
        if self.duel.as_mut().is_some_and(Duel::on_round_begin) {
            self.duel_timer.start(now);
            if let Some(duel) = &self.duel {
                log::info!("Duel against {} is live", duel.opponent_name);
            }
        } else if let Some(duel) = self.duel.take() {
            if !matches!(duel.status, DuelStatus::Finished(_)) {
                log::info!("Duel against {} dropped before acceptance", duel.opponent_name);
            }
        }

        events.extend(step.into_iter().map(SessionEvent::Game));
        events
    }

    /// Queue a flap for the next frame. Ignored unless playing.
    pub fn flap(&mut self) -> bool {
        if !self.game.is_playing() {
            return false;
        }
        self.pending.flap = true;
        true
    }

    /// Ended -> Start. Market and balance are untouched.
    pub fn restart(&mut self) -> Vec<SessionEvent> {
        let step = sim::restart(&mut self.game);
        if step.is_empty() {
            return Vec::new();
        }
        let mut events = self.reset_round_presentation();
        events.extend(step.into_iter().map(SessionEvent::Game));
        events
    }

    fn reset_round_presentation(&mut self) -> Vec<SessionEvent> {
        self.pending = TickInput::default();
        self.commentary = None;
        self.reward_pending = false;
        if self.theme.id == DEFAULT_THEME {
            return Vec::new();
        }
        self.theme = default_theme();
        vec![SessionEvent::ThemeChanged {
            theme: self.theme.id,
        }]
    }

    fn apply_game_events(&mut self, step: Vec<GameEvent>, now: u64, events: &mut Vec<SessionEvent>) {
        for event in step {
            events.push(SessionEvent::Game(event.clone()));
            match event {
                GameEvent::Milestone { threshold } => self.on_milestone(threshold, now, events),
                GameEvent::RoundEnded { final_score, .. } => {
                    self.on_round_end(final_score, now, events)
                }
                _ => {}
            }
        }
    }

    fn on_milestone(&mut self, threshold: u32, now: u64, events: &mut Vec<SessionEvent>) {
        let Some(theme) = themes::for_threshold(threshold) else {
            return;
        };
        self.theme = theme;
        events.push(SessionEvent::ThemeChanged { theme: theme.id });
        log::info!("Theme changed to {}", theme.name);

        if let Some(skin_id) = theme.reward_skin {
            if self.catalog.contains(skin_id) && self.profile.add_item(skin_id) {
                log::info!("Unlocked {}", self.catalog.name_of(skin_id));
                events.push(SessionEvent::SkinUnlocked {
                    skin_id: skin_id.to_string(),
                });
                self.saver.mark_dirty(now);
            }
        }
    }

    /// Commit everything round-scoped before commentary is requested
    fn on_round_end(&mut self, final_score: u32, now: u64, events: &mut Vec<SessionEvent>) {
        self.pending = TickInput::default();

        let amount = u64::from(final_score);
        self.profile.credit(amount);
        events.push(SessionEvent::CoinsEarned { amount });

        if self.profile.record_score(final_score) {
            log::info!("New high score: {final_score}");
            events.push(SessionEvent::NewHighScore { score: final_score });
        }
        if let Some(rank) = self.high_scores.add_score(final_score, self.theme.id, now) {
            self.leaderboard_dirty = true;
            events.push(SessionEvent::LeaderboardRank { rank });
        }
        if let Some(event) = self.duel.as_mut().and_then(|d| d.on_round_end(final_score)) {
            events.push(SessionEvent::Duel(event));
        }
        self.saver.mark_dirty(now);

        if reward::earns_unique_skin(final_score) {
            self.reward_pending = true;
            events.push(SessionEvent::SkinMintRequested { score: final_score });
        }
        events.push(SessionEvent::CommentaryRequested { score: final_score });
    }

    // === Reward skins ===

    /// Mint the unique skin earned this round. On success the unlock message
    /// replaces commentary; on failure the host falls back to commentary.
    pub fn mint_reward(&mut self, minter: &mut dyn SkinMinter) -> Option<SessionEvent> {
        if self.game.phase != GamePhase::Ended || !self.reward_pending {
            return None;
        }
        self.reward_pending = false;
        let score = self.game.final_score?;

        let draft = match minter.mint(score) {
            Ok(draft) => draft,
            Err(e) => {
                log::warn!("Unique skin generation failed: {e}");
                return None;
            }
        };
        let now = self.clock.now_ms();
        let skin = draft.into_skin(self.next_skin_id(now));
        let (skin_id, name) = (skin.id.clone(), skin.name.clone());
        log::info!("Minted unique skin {name} ({skin_id}) worth {}", skin.price);

        self.catalog.insert(skin.clone());
        self.profile.grant_custom_skin(skin);
        self.commentary = Some(reward::unlock_message(&name));
        self.saver.mark_dirty(now);
        Some(SessionEvent::UniqueSkinMinted { skin_id, name })
    }

    pub fn reward_pending(&self) -> bool {
        self.reward_pending
    }

    fn next_skin_id(&mut self, now: u64) -> String {
        loop {
            self.minted += 1;
            let id = format!("gen-{now}-{}", self.minted);
            if !self.catalog.contains(&id) {
                return id;
            }
        }
    }

    // === Commentary ===

    /// Merge a commentary result. Only accepted while the round is over.
    pub fn attach_commentary(&mut self, result: Result<String, CommentaryError>) -> bool {
        if self.game.phase != GamePhase::Ended {
            return false;
        }
        self.commentary = Some(commentary::resolve(result));
        true
    }

    /// Fetch and merge commentary for the latched final score
    pub fn request_commentary(&mut self, commentator: &mut dyn Commentator) -> bool {
        let Some(score) = self.game.final_score else {
            return false;
        };
        self.attach_commentary(commentator.comment(score))
    }

    pub fn commentary(&self) -> Option<&str> {
        self.commentary.as_deref()
    }

    // === Shop ===

    pub fn list_item(&mut self, skin_id: &str, price: u64) -> Result<MarketEvent, MarketError> {
        let now = self.clock.now_ms();
        let seller = self.settings.display_name().to_string();
        let event = self.market.list_item(
            &mut self.profile,
            &self.catalog,
            skin_id,
            price,
            &seller,
            now,
        )?;
        self.saver.mark_dirty(now);
        Ok(event)
    }

    pub fn cancel_listing(&mut self, id: ListingId) -> Result<MarketEvent, MarketError> {
        let now = self.clock.now_ms();
        let event = self.market.cancel_listing(&mut self.profile, id, now)?;
        self.saver.mark_dirty(now);
        Ok(event)
    }

    pub fn quick_sell(&mut self, skin_id: &str) -> Result<MarketEvent, MarketError> {
        let event = self
            .market
            .quick_sell(&mut self.profile, &self.catalog, skin_id)?;
        self.saver.mark_dirty(self.clock.now_ms());
        Ok(event)
    }

    pub fn buy(&mut self, id: ListingId) -> Result<MarketEvent, MarketError> {
        let now = self.clock.now_ms();
        let event = self.market.buy(&mut self.profile, id, now)?;
        self.saver.mark_dirty(now);
        Ok(event)
    }

    pub fn gift(&mut self, skin_id: &str, recipient: &str) -> Result<MarketEvent, MarketError> {
        let event = self.market.gift(&mut self.profile, skin_id, recipient)?;
        self.saver.mark_dirty(self.clock.now_ms());
        Ok(event)
    }

    pub fn equip(&mut self, skin_id: &str) -> Result<(), MarketError> {
        self.profile.equip(skin_id)?;
        self.saver.mark_dirty(self.clock.now_ms());
        Ok(())
    }

    // === Duel ===

    /// Challenge an opponent. Refused while a duel round is running.
    pub fn request_duel(&mut self, opponent: &str) -> Option<SessionEvent> {
        let opponent = opponent.trim();
        if opponent.is_empty() || self.duel.as_ref().is_some_and(Duel::is_active) {
            return None;
        }
        self.duel = Some(Duel::request(opponent, self.clock.now_ms()));
        log::info!("Duel requested against {opponent}");
        Some(SessionEvent::Duel(DuelEvent::Requested {
            opponent: opponent.to_string(),
        }))
    }

    pub fn duel(&self) -> Option<&Duel> {
        self.duel.as_ref()
    }

    // === Persistence ===

    /// Save now instead of waiting for the debounce window
    pub fn save_now(&mut self) -> Vec<SessionEvent> {
        self.saver.cancel();
        let mut events = Vec::new();
        self.flush(self.clock.now_ms(), &mut events);
        events
    }

    /// Write the leaderboard and profile, then back up. Failures leave memory untouched.
    fn flush(&mut self, now: u64, events: &mut Vec<SessionEvent>) {
        if self.leaderboard_dirty {
            match self.high_scores.save(self.store.as_mut()) {
                Ok(()) => self.leaderboard_dirty = false,
                Err(e) => {
                    log::warn!("Failed to save high scores: {e}");
                    events.push(SessionEvent::SaveFailed {
                        error: e.to_string(),
                    });
                }
            }
        }

        match save_profile(self.store.as_mut(), &self.profile) {
            Ok(()) => {
                log::debug!("Profile saved");
                events.push(SessionEvent::Saved);
            }
            Err(e) => {
                log::warn!("Failed to save profile: {e}");
                events.push(SessionEvent::SaveFailed {
                    error: e.to_string(),
                });
            }
        }

        let (Some(sink), Some(username)) = (self.backup.as_mut(), self.settings.username.as_deref())
        else {
            return;
        };
        let envelope = BackupEnvelope::new(username, &self.profile, now);
        match sink.backup(&envelope) {
            Ok(()) => events.push(SessionEvent::BackedUp),
            Err(e) => {
                log::warn!("Cloud backup failed: {e}");
                events.push(SessionEvent::BackupFailed {
                    error: e.to_string(),
                });
            }
        }
    }

    // === Views ===

    pub fn snapshot(&self) -> FrameSnapshot {
        self.game.snapshot()
    }

    pub fn game(&self) -> &GameState {
        &self.game
    }

    pub fn phase(&self) -> GamePhase {
        self.game.phase
    }

    pub fn profile(&self) -> &Profile {
        &self.profile
    }

    pub fn market(&self) -> &Market {
        &self.market
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn theme(&self) -> &'static Theme {
        self.theme
    }

    pub fn high_scores(&self) -> &HighScores {
        &self.high_scores
    }

    /// Simulated global board with the player's best score
    pub fn leaderboard(&self) -> Vec<BoardRow> {
        global_leaderboard(self.settings.display_name(), self.profile.high_score)
    }

    pub fn store(&self) -> &dyn KeyValueStore {
        self.store.as_ref()
    }

    pub fn now_ms(&self) -> u64 {
        self.clock.now_ms()
    }
}

fn default_theme() -> &'static Theme {
    &themes::THEMES[0]
}

#[cfg(test)]
mod tests {
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    use super::*;
    use crate::commentary::{CannedCommentator, FALLBACK_MESSAGE};
    use crate::duel::DuelOutcome;
    use crate::market::{Pattern, Rarity, Skin};
    use crate::persistence::layout::{KEY_COINS, KEY_INVENTORY};
    use crate::platform::storage::{MemoryStore, StoreError};
    use crate::platform::time::ManualClock;
    use crate::reward::{MintError, SkinDraft};
    use crate::settings::PhysicsConfig;

    const T0: u64 = 1_700_000_000_000;

    /// Gravity off and a gap spanning the whole band: pipes stream past
    /// and score until the bird is flapped into the ceiling.
    fn calm_settings() -> Settings {
        Settings {
            physics: PhysicsConfig {
                gravity: 0.0,
                pipe_spawn_frames: 10,
                min_pipe_height: 0,
                pipe_gap: 620,
                ..PhysicsConfig::default()
            },
            ..Settings::default()
        }
    }

    fn session_with(settings: Settings, store: MemoryStore) -> (Session, ManualClock) {
        let clock = ManualClock::new(T0);
        let session = Session::new(settings, Box::new(clock.clone()), Box::new(store), 7);
        (session, clock)
    }

    fn store_with_skin(skin_id: &str) -> MemoryStore {
        let mut store = MemoryStore::new();
        let mut profile = Profile::default();
        profile.add_item(skin_id);
        save_profile(&mut store, &profile).unwrap();
        store
    }

    /// Advance in 50 ms steps until `done` holds
    fn run_until(
        session: &mut Session,
        clock: &ManualClock,
        mut done: impl FnMut(&Session) -> bool,
    ) -> Vec<SessionEvent> {
        let mut events = Vec::new();
        for _ in 0..2_000 {
            if done(session) {
                return events;
            }
            clock.advance(50);
            events.extend(session.update());
        }
        panic!("condition never reached");
    }

    fn play_to_end(session: &mut Session, clock: &ManualClock, score: u32) -> Vec<SessionEvent> {
        session.begin();
        let mut events = run_until(session, clock, |s| s.game().score >= score);
        assert!(session.flap());
        events.extend(run_until(session, clock, |s| s.phase() == GamePhase::Ended));
        events
    }

    #[test]
    fn test_round_end_commits_before_commentary() {
        let (mut session, clock) = session_with(calm_settings(), MemoryStore::new());
        session.start();
        let events = play_to_end(&mut session, &clock, 3);

        let final_score = session.game().final_score.unwrap();
        assert!(final_score >= 3);
        assert_eq!(session.profile().balance, u64::from(final_score));
        assert_eq!(session.profile().high_score, final_score);
        assert_eq!(session.high_scores().top_score(), Some(final_score));

        let coins = events
            .iter()
            .position(|e| matches!(e, SessionEvent::CoinsEarned { .. }))
            .unwrap();
        let request = events
            .iter()
            .position(|e| matches!(e, SessionEvent::CommentaryRequested { .. }))
            .unwrap();
        assert!(coins < request);

        assert!(session.request_commentary(&mut CannedCommentator));
        assert!(session.commentary().is_some());
        assert!(session.attach_commentary(Err(CommentaryError::Timeout)));
        assert_eq!(session.commentary(), Some(FALLBACK_MESSAGE));
    }

    #[test]
    fn test_commentary_refused_outside_ended() {
        let (mut session, _clock) = session_with(calm_settings(), MemoryStore::new());
        assert!(!session.attach_commentary(Ok("hi".to_string())));
        session.begin();
        assert!(!session.attach_commentary(Ok("hi".to_string())));
        assert!(session.commentary().is_none());
    }

    #[test]
    fn test_milestone_switches_theme_and_unlocks_skin() {
        let (mut session, clock) = session_with(calm_settings(), MemoryStore::new());
        session.start();
        session.begin();
        let events = run_until(&mut session, &clock, |s| s.game().score >= 10);

        assert_eq!(session.theme().id, "sunset");
        assert!(session.profile().owns("red"));
        assert!(events.contains(&SessionEvent::SkinUnlocked {
            skin_id: "red".to_string()
        }));

        session.flap();
        run_until(&mut session, &clock, |s| s.phase() == GamePhase::Ended);
        let events = session.restart();
        assert_eq!(session.theme().id, DEFAULT_THEME);
        assert!(events.contains(&SessionEvent::ThemeChanged {
            theme: DEFAULT_THEME
        }));
        // Skin stays owned across rounds
        assert!(session.profile().owns("red"));
    }

    #[test]
    fn test_restart_always_clean() {
        let (mut session, clock) = session_with(calm_settings(), MemoryStore::new());
        session.start();
        play_to_end(&mut session, &clock, 2);
        assert!(!session.snapshot().pipes.is_empty());
        let balance = session.profile().balance;

        // Begin is ignored while ended
        assert!(session.begin().is_empty());
        assert!(!session.flap());

        session.restart();
        let snap = session.snapshot();
        assert_eq!(snap.phase, GamePhase::Start);
        assert!(snap.pipes.is_empty());
        assert_eq!(snap.score, 0);

        session.begin();
        let snap = session.snapshot();
        assert_eq!(snap.phase, GamePhase::Playing);
        assert!(snap.pipes.is_empty());
        assert_eq!(snap.score, 0);
        assert_eq!(session.profile().balance, balance);
    }

    #[test]
    fn test_market_ticks_in_every_phase() {
        let (mut session, clock) = session_with(Settings::default(), store_with_skin("red"));
        session.start();
        assert_eq!(session.market().listings().len(), 8);

        session.list_item("red", 400).unwrap();
        assert!(!session.profile().owns("red"));

        // Still in Start: the market keeps trading anyway
        let mut sold = false;
        for _ in 0..150 {
            clock.advance(3_000);
            let events = session.update();
            if events
                .iter()
                .any(|e| matches!(e, SessionEvent::Market(MarketEvent::Sold { .. })))
            {
                sold = true;
                break;
            }
        }
        assert!(sold);
        assert_eq!(session.phase(), GamePhase::Start);
        assert_eq!(session.profile().balance, 400);
    }

    #[test]
    fn test_buy_rejected_without_funds() {
        let (mut session, _clock) = session_with(Settings::default(), MemoryStore::new());
        session.start();
        let listing = session.market().listings()[0].id;
        let before = session.market().listings().len();

        assert!(matches!(
            session.buy(listing),
            Err(MarketError::InsufficientFunds { available: 0, .. })
        ));
        assert_eq!(session.market().listings().len(), before);
        assert_eq!(session.profile().balance, 0);
    }

    #[test]
    fn test_saves_are_debounced() {
        let (mut session, clock) = session_with(Settings::default(), store_with_skin("leaf"));
        session.start();
        session.quick_sell("leaf").unwrap();
        assert_eq!(session.profile().balance, 600);

        clock.advance(1_000);
        assert!(!session.update().contains(&SessionEvent::Saved));
        assert_eq!(session.store().get(KEY_COINS).unwrap().as_deref(), Some("0"));

        clock.advance(1_000);
        assert!(session.update().contains(&SessionEvent::Saved));
        assert_eq!(session.store().get(KEY_COINS).unwrap().as_deref(), Some("600"));
        let inventory = session.store().get(KEY_INVENTORY).unwrap().unwrap();
        assert!(!inventory.contains("leaf"));
    }

    #[test]
    fn test_save_failure_keeps_memory_state() {
        let (mut session, clock) = session_with(Settings::default(), MemoryStore::read_only());
        session.start();
        session.equip("default").unwrap();

        clock.advance(2_000);
        let events = session.update();
        assert!(
            events
                .iter()
                .any(|e| matches!(e, SessionEvent::SaveFailed { .. }))
        );
        assert_eq!(session.profile().equipped, "default");
        assert_eq!(session.market().listings().len(), 8);
    }

    struct Recorder(Rc<RefCell<Vec<BackupEnvelope>>>);

    impl BackupSink for Recorder {
        fn backup(&mut self, envelope: &BackupEnvelope) -> Result<(), StoreError> {
            self.0.borrow_mut().push(envelope.clone());
            Ok(())
        }
    }

    #[test]
    fn test_backup_needs_username() {
        let sent = Rc::new(RefCell::new(Vec::new()));
        let (session, _clock) = session_with(Settings::default(), MemoryStore::new());
        let mut session = session.with_backup(Box::new(Recorder(sent.clone())));
        session.save_now();
        assert!(sent.borrow().is_empty());

        let settings = Settings {
            username: Some("Flapper".to_string()),
            ..Settings::default()
        };
        let (session, clock) = session_with(settings, MemoryStore::new());
        let mut session = session.with_backup(Box::new(Recorder(sent.clone())));
        let events = session.save_now();
        assert!(events.contains(&SessionEvent::BackedUp));
        let sent = sent.borrow();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].username, "Flapper");
        assert_eq!(sent[0].timestamp_ms, clock.now_ms());
    }

    #[test]
    fn test_duel_round() {
        let (mut session, clock) = session_with(calm_settings(), MemoryStore::new());
        session.start();
        assert!(session.request_duel("BirdMaster").is_some());

        clock.advance(2_000);
        let events = session.update();
        assert!(events.iter().any(|e| matches!(
            e,
            SessionEvent::Duel(DuelEvent::Accepted { .. })
        )));

        session.begin();
        assert!(session.duel().is_some_and(Duel::is_active));
        assert!(session.request_duel("FlapKing").is_none());

        let events = play_to_end(&mut session, &clock, 1);
        let finished = events.iter().find_map(|e| match e {
            SessionEvent::Duel(DuelEvent::Finished { outcome, .. }) => Some(*outcome),
            _ => None,
        });
        assert!(finished.is_some());
        assert!(matches!(
            session.duel().map(|d| d.status),
            Some(DuelStatus::Finished(
                DuelOutcome::Won | DuelOutcome::Lost | DuelOutcome::Draw
            ))
        ));

        // A finished duel is dropped at the next round
        session.restart();
        session.begin();
        assert!(session.duel().is_none());
    }

    #[test]
    fn test_stop_releases_timers() {
        let (mut session, clock) = session_with(calm_settings(), MemoryStore::new());
        session.start();
        session.begin();
        session.stop();
        assert!(!session.is_running());

        clock.advance(10_000);
        assert!(session.update().is_empty());
        assert_eq!(session.game().frame_count, 0);
    }

    #[test]
    fn test_pending_duel_dropped_at_begin() {
        let (mut session, _clock) = session_with(calm_settings(), MemoryStore::new());
        session.start();
        assert!(session.request_duel("FlapKing").is_some());

        // Not yet accepted when the round starts
        session.begin();
        assert!(session.duel().is_none());
    }

    #[test]
    fn test_out_of_range_market_settings_tick_safely() {
        let mut store = MemoryStore::new();
        store
            .set(Settings::STORAGE_KEY, r#"{"market":{"replenish_chance":1.5}}"#)
            .unwrap();
        let clock = ManualClock::new(T0);
        let mut session = Session::load(Box::new(clock.clone()), Box::new(store), 7);
        assert_eq!(session.market().config().replenish_chance, 1.0);

        session.start();
        for _ in 0..20 {
            clock.advance(3_000);
            session.update();
        }
        assert!(!session.market().listings().is_empty());
    }

    /// Memory store that counts writes
    struct CountingStore {
        inner: MemoryStore,
        writes: Rc<Cell<usize>>,
    }

    impl KeyValueStore for CountingStore {
        fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
            self.inner.get(key)
        }

        fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
            self.writes.set(self.writes.get() + 1);
            self.inner.set(key, value)
        }

        fn remove(&mut self, key: &str) -> Result<(), StoreError> {
            self.writes.set(self.writes.get() + 1);
            self.inner.remove(key)
        }
    }

    #[test]
    fn test_round_end_defers_leaderboard_write() {
        let writes = Rc::new(Cell::new(0));
        let store = CountingStore {
            inner: MemoryStore::new(),
            writes: writes.clone(),
        };
        let clock = ManualClock::new(T0);
        let mut session = Session::new(calm_settings(), Box::new(clock.clone()), Box::new(store), 7);
        session.start();
        session.begin();
        run_until(&mut session, &clock, |s| s.game().score >= 2);
        assert!(session.flap());

        let mut ended = false;
        for _ in 0..200 {
            clock.advance(50);
            let before = writes.get();
            let events = session.update();
            if session.phase() == GamePhase::Ended {
                assert!(
                    events
                        .iter()
                        .any(|e| matches!(e, SessionEvent::LeaderboardRank { rank: 1 }))
                );
                assert_eq!(writes.get(), before);
                ended = true;
                break;
            }
        }
        assert!(ended);
        assert!(session.store().get(HighScores::STORAGE_KEY).unwrap().is_none());

        clock.advance(2_000);
        assert!(session.update().contains(&SessionEvent::Saved));
        let saved = HighScores::load(session.store());
        assert_eq!(saved.top_score(), session.game().final_score);
    }

    struct FixedMinter {
        reply: Result<SkinDraft, MintError>,
        calls: usize,
    }

    impl SkinMinter for FixedMinter {
        fn mint(&mut self, _score: u32) -> Result<SkinDraft, MintError> {
            self.calls += 1;
            self.reply.clone()
        }
    }

    fn starborn() -> SkinDraft {
        SkinDraft {
            name: "Starborn Seraph".to_string(),
            pattern: Pattern::Gradient,
            price: 15_000,
        }
    }

    #[test]
    fn test_unique_skin_minted_after_round_commit() {
        let (mut session, clock) = session_with(calm_settings(), MemoryStore::new());
        session.start();
        let events = play_to_end(&mut session, &clock, 101);
        let score = session.game().final_score.unwrap();
        assert!(events.contains(&SessionEvent::SkinMintRequested { score }));
        assert_eq!(session.profile().balance, u64::from(score));

        let mut minter = FixedMinter {
            reply: Ok(starborn()),
            calls: 0,
        };
        let minted = session.mint_reward(&mut minter);
        let skin_id = session
            .profile()
            .custom_skins
            .keys()
            .next()
            .cloned()
            .unwrap();
        assert_eq!(
            minted,
            Some(SessionEvent::UniqueSkinMinted {
                skin_id: skin_id.clone(),
                name: "Starborn Seraph".to_string(),
            })
        );
        assert!(skin_id.starts_with("gen-"));
        assert!(session.profile().owns(&skin_id));
        assert!(session.catalog().get(&skin_id).is_some_and(Skin::is_unique));
        assert_eq!(
            session.commentary(),
            Some(reward::unlock_message("Starborn Seraph").as_str())
        );

        // One reward per round
        assert!(session.mint_reward(&mut minter).is_none());
        assert_eq!(minter.calls, 1);

        clock.advance(2_000);
        assert!(session.update().contains(&SessionEvent::Saved));
        let stored = load_profile(session.store());
        assert!(stored.custom_skins.contains_key(&skin_id));
        assert!(stored.owns(&skin_id));
    }

    #[test]
    fn test_failed_mint_falls_back_to_commentary() {
        let (mut session, clock) = session_with(calm_settings(), MemoryStore::new());
        session.start();
        play_to_end(&mut session, &clock, 101);
        let skins = session.catalog().len();

        let mut minter = FixedMinter {
            reply: Err(MintError::Timeout),
            calls: 0,
        };
        assert!(session.mint_reward(&mut minter).is_none());
        assert!(!session.reward_pending());
        assert_eq!(session.catalog().len(), skins);
        assert!(session.commentary().is_none());

        assert!(session.request_commentary(&mut CannedCommentator));
        assert!(session.commentary().is_some());
    }

    #[test]
    fn test_low_score_earns_no_unique_skin() {
        let (mut session, clock) = session_with(calm_settings(), MemoryStore::new());
        session.start();
        let events = play_to_end(&mut session, &clock, 3);
        assert!(
            !events
                .iter()
                .any(|e| matches!(e, SessionEvent::SkinMintRequested { .. }))
        );

        let mut minter = FixedMinter {
            reply: Ok(starborn()),
            calls: 0,
        };
        assert!(session.mint_reward(&mut minter).is_none());
        assert_eq!(minter.calls, 0);
    }

    #[test]
    fn test_custom_skins_rejoin_catalog_on_load() {
        let mut store = MemoryStore::new();
        let mut profile = Profile::default();
        profile.grant_custom_skin(Skin {
            id: "gen-1-1".to_string(),
            name: "Ember Comet".to_string(),
            rarity: Rarity::Unique,
            pattern: Pattern::Striped,
            price: 9_000,
        });
        save_profile(&mut store, &profile).unwrap();

        let (mut session, _clock) = session_with(calm_settings(), store);
        assert_eq!(session.catalog().name_of("gen-1-1"), "Ember Comet");
        session.equip("gen-1-1").unwrap();
        assert_eq!(session.profile().equipped, "gen-1-1");
    }
}
