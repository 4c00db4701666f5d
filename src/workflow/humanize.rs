//! Human-like driving of the page
//!
//! Owns the behavioral models and replays what they generate against the
//! driver, sleeping in place between events.

use crate::config::{StealthConfig, TimingConfig};
use crate::driver::{ElementHandle, PageDriver};
use crate::stealth::{
    DelayProfile, KeyEvent, ModelSeeds, MotionModel, Point, ScrollModel, TimingModel, TypingModel,
    Viewport,
};
use crate::Result;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::trace;

#[derive(Debug)]
pub struct Humanizer {
    driver: Arc<dyn PageDriver>,
    motion: MotionModel,
    typing: TypingModel,
    scroll: ScrollModel,
    timing: TimingModel,
    delays: TimingConfig,
    pointer: Point,
    viewport: Viewport,
    scroll_y: i64,
}

impl Humanizer {
    pub fn new(driver: Arc<dyn PageDriver>, config: &StealthConfig, seeds: &mut ModelSeeds) -> Self {
        let viewport = Viewport {
            width: 1920,
            height: 1080,
        };
        Self {
            driver,
            motion: MotionModel::new(config.motion.clone(), seeds.next_timing()),
            typing: TypingModel::new(config.typing.clone(), seeds.next_timing()),
            scroll: ScrollModel::new(config.scroll.clone(), seeds.next_timing()),
            timing: seeds.next_timing(),
            delays: config.timing.clone(),
            pointer: Point::new(f64::from(viewport.width) / 2.0, f64::from(viewport.height) / 2.0),
            viewport,
            scroll_y: 0,
        }
    }

    pub fn driver(&self) -> &Arc<dyn PageDriver> {
        &self.driver
    }

    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.viewport = viewport;
        self.pointer = Point::new(f64::from(viewport.width) / 2.0, f64::from(viewport.height) / 2.0);
    }

    pub fn pointer(&self) -> Point {
        self.pointer
    }

    /// Shared random source for choices outside the models
    pub fn timing(&mut self) -> &mut TimingModel {
        &mut self.timing
    }

    /// A new document starts at the top
    pub fn page_changed(&mut self) {
        self.scroll_y = 0;
    }

    /// Move the pointer along a generated path
    pub async fn move_to(&mut self, target: Point) -> Result<()> {
        let path = self.motion.path(self.pointer, target);
        for (point, hop) in path.points.iter().skip(1).zip(path.durations.iter()) {
            sleep(*hop).await;
            self.driver.move_pointer(*point).await?;
        }
        self.pointer = path.end();
        Ok(())
    }

    /// Approach, optionally hover, then click inside the element
    pub async fn click(&mut self, element: &ElementHandle) -> Result<()> {
        let target = self.motion.click_point(&element.bounds);
        if self.motion.config().random_movement {
            let waypoints = self
                .motion
                .approach(target, (self.viewport.width, self.viewport.height));
            for waypoint in waypoints {
                self.move_to(waypoint).await?;
            }
        }
        self.move_to(target).await?;
        if self.motion.config().hover_before_click {
            let hover = self.delays.hover.clone();
            self.pause(&hover).await;
        }
        trace!(role = %element.role, x = target.x, y = target.y, "Click");
        self.driver.click(element, target).await?;

        if let Some((drift, delay)) = self
            .motion
            .post_click(target, (self.viewport.width, self.viewport.height))
        {
            sleep(delay).await;
            self.driver.move_pointer(drift).await?;
            self.pointer = drift;
        }
        Ok(())
    }

    /// Type into the focused element with generated keystroke timing
    pub async fn type_text(&mut self, text: &str) -> Result<()> {
        let keys = self.typing.keystrokes(text);
        for event in keys.iter() {
            sleep(event.delay()).await;
            match event {
                KeyEvent::Char { ch, .. } => self.driver.type_char(*ch).await?,
                KeyEvent::Backspace { .. } => self.driver.press_backspace().await?,
                KeyEvent::Pause { .. } => {}
            }
        }
        Ok(())
    }

    /// Click into a field and type
    pub async fn fill(&mut self, field: &ElementHandle, text: &str) -> Result<()> {
        self.click(field).await?;
        self.type_text(text).await
    }

    /// Scroll by `distance` pixels through generated steps
    pub async fn scroll_by(&mut self, distance: i64) -> Result<()> {
        let target = (self.scroll_y + distance).max(0);
        for step in self.scroll.scroll_steps(self.scroll_y, target) {
            if step.delta != 0 {
                self.driver.scroll_by(step.delta).await?;
            }
            sleep(step.duration).await;
        }
        self.scroll_y = target;
        Ok(())
    }

    /// Scroll down one results page worth to trigger lazy loading
    pub async fn scroll_page(&mut self) -> Result<()> {
        let distance = self.scroll.config().page_distance;
        self.scroll_by(distance).await
    }

    pub async fn pause(&mut self, profile: &DelayProfile) -> Duration {
        let delay = self.timing.sample(profile);
        sleep(delay).await;
        delay
    }

    pub async fn think(&mut self) -> Duration {
        let think = self.delays.think.clone();
        self.pause(&think).await
    }

    pub async fn modal_pause(&mut self) -> Duration {
        let modal = self.delays.modal.clone();
        self.pause(&modal).await
    }

    /// Wait for the document, then linger like a reader would
    pub async fn settle(&mut self, timeout: Duration) -> Result<()> {
        self.driver.wait_loaded(timeout).await?;
        self.page_changed();
        let page_load = self.delays.page_load.clone();
        self.pause(&page_load).await;
        Ok(())
    }
}
