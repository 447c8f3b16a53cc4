//! Skyflap entry point
//!
//! Headless native demo: an autopilot plays a few rounds against a simulated
//! clock while the market ticks in the background. Pass a directory to keep
//! the profile on disk between runs.

use rand::SeedableRng;
use rand_pcg::Pcg32;
use skyflap::commentary::CannedCommentator;
use skyflap::highscores::format_age;
use skyflap::market::MarketEvent;
use skyflap::persistence::StoreBackup;
use skyflap::platform::{Clock, FileStore, KeyValueStore, ManualClock, MemoryStore};
use skyflap::reward::RandomMinter;
use skyflap::sim::{GamePhase, GameState};
use skyflap::{Session, SessionEvent};

/// Rounds the autopilot plays
const ROUNDS: u32 = 3;
/// Simulated milliseconds per host update
const HOST_STEP_MS: u64 = 16;
/// Give up on a round after this much simulated time
const ROUND_LIMIT_MS: u64 = 120_000;
/// Slack below the gap center before flapping
const FLAP_SLACK: f32 = 12.0;

/// Flap when falling below the center of the next gap
fn autopilot(game: &GameState) -> bool {
    let bird = &game.bird;
    let target = game
        .pipes
        .iter()
        .find(|p| p.right() > bird.left())
        .map(|p| p.top_height as f32 + p.gap as f32 / 2.0)
        .unwrap_or(game.physics.play_height() / 2.0);
    bird.pos.y > target + FLAP_SLACK && bird.vel >= 0.0
}

fn open_store(dir: Option<&str>) -> Box<dyn KeyValueStore> {
    let Some(dir) = dir else {
        return Box::new(MemoryStore::new());
    };
    match FileStore::open(dir) {
        Ok(store) => {
            log::info!("Using profile directory {dir}");
            Box::new(store)
        }
        Err(e) => {
            log::warn!("Cannot open {dir} ({e}), keeping the profile in memory");
            Box::new(MemoryStore::new())
        }
    }
}

fn report(events: &[SessionEvent]) {
    for event in events {
        match event {
            SessionEvent::Market(MarketEvent::Sold { skin_id, price, buyer, .. }) => {
                println!("  {buyer} bought your {skin_id} for {price}");
            }
            SessionEvent::ThemeChanged { theme } => println!("  theme -> {theme}"),
            SessionEvent::SkinUnlocked { skin_id } => println!("  unlocked {skin_id}"),
            SessionEvent::NewHighScore { score } => println!("  new high score {score}"),
            SessionEvent::UniqueSkinMinted { name, .. } => println!("  minted {name}"),
            SessionEvent::SaveFailed { error } => println!("  save failed: {error}"),
            _ => {}
        }
    }
}

fn main() {
    env_logger::init();
    log::info!("Skyflap (headless) starting...");

    let dir = std::env::args().nth(1);
    let clock = ManualClock::new(0);
    let mut session = Session::load(Box::new(clock.clone()), open_store(dir.as_deref()), 0x5eed);
    // Backups land next to the profile under their own key
    if let Some(store) = dir.as_deref().and_then(|d| FileStore::open(d).ok()) {
        session = session.with_backup(Box::new(StoreBackup::new(store)));
    }
    session.start();
    let mut minter = RandomMinter::new(Pcg32::seed_from_u64(0xf1a9));

    for round in 1..=ROUNDS {
        session.begin();
        let started = clock.now_ms();
        while session.phase() == GamePhase::Playing && clock.now_ms() - started < ROUND_LIMIT_MS {
            if autopilot(session.game()) {
                session.flap();
            }
            clock.advance(HOST_STEP_MS);
            report(&session.update());
        }

        if session.phase() != GamePhase::Ended {
            println!("Round {round}: autopilot still flying after {ROUND_LIMIT_MS} ms");
            break;
        }
        // A minted skin's unlock message stands in for commentary
        let minted = if session.reward_pending() {
            session.mint_reward(&mut minter)
        } else {
            None
        };
        match minted {
            Some(event) => report(&[event]),
            None => {
                session.request_commentary(&mut CannedCommentator);
            }
        }
        println!(
            "Round {round}: scored {} | {}",
            session.game().final_score.unwrap_or(0),
            session.commentary().unwrap_or_default()
        );
        session.restart();
    }

    // Put the rarest owned skin up for sale and let the market run a while
    let spare = session
        .profile()
        .inventory
        .iter()
        .filter_map(|id| session.catalog().get(id))
        .filter(|skin| skin.id != session.profile().equipped && skin.price > 0)
        .max_by_key(|skin| skin.price)
        .map(|skin| (skin.id.clone(), skin.price));
    if let Some((skin_id, price)) = spare {
        match session.list_item(&skin_id, price) {
            Ok(_) => println!("Listed {skin_id} for {price}"),
            Err(e) => println!("Could not list {skin_id}: {e}"),
        }
    }
    let now = clock.now_ms();
    for listing in session.market().active(now).take(5) {
        println!(
            "  {} {} by {} ({}s left)",
            session.catalog().name_of(&listing.skin_id),
            listing.price,
            listing.seller_name,
            listing.remaining_ms(now) / 1_000
        );
    }
    for _ in 0..40 {
        clock.advance(session.market().config().tick_ms);
        report(&session.update());
    }

    report(&session.stop());

    let profile = session.profile();
    println!(
        "Balance {} | best {} | skins {:?}",
        profile.balance, profile.high_score, profile.inventory
    );
    println!("Local board:");
    for entry in &session.high_scores().entries {
        println!(
            "  {} ({}) {}",
            entry.score,
            entry.theme,
            format_age(entry.timestamp_ms, clock.now_ms())
        );
    }
    println!("Global board:");
    for (rank, row) in session.leaderboard().iter().enumerate() {
        println!("  {}. {} {}", rank + 1, row.name, row.score);
    }
}
