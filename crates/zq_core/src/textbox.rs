//! The dialogue textbox: wrapping, paging, progressive reveal and the
//! slide-in / slide-out animation state machine.
//!
//! ```text
//!   Idle --Start--> SlideUp --SlideFinished--> Scrolling --Dismiss--> SlideDown
//!    ^                                          |  ^                      |
//!    |                                          +--+ Skip / NextPage      |
//!    +------------------------SlideFinished-------------------------------+
//! ```
//!
//! All timing is counted in logic frames. `update()` is called once per fixed
//! step; `press()` is called for every pad button pressed during that step,
//! before `update()`.
//!
//! Coordinates are in display pixels with y pointing down. At rest the box's
//! top edge sits on the bottom edge of the display, horizontally centered, so
//! it is fully hidden; `slide_offset` is how far it has risen from there.

use std::collections::VecDeque;

use glam::IVec2;
use serde::Deserialize;

use crate::dialogue::{Color, DialogueFrame, DEFAULT_TEXT_COLOR};
use crate::font::TextMeasure;
use crate::input::Button;
use crate::motion::{
    BlinkCycle, SlideSchedule, DEFAULT_ARROW_BLINK, DEFAULT_ARROW_BLINK_FRAMES,
    DEFAULT_SLIDE_SCHEDULE, MAX_ARROW_BLINK_FRAMES,
};
use crate::reveal::RevealCursor;
use crate::wrap::{paginate, wrap_lines};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextBoxState {
    Idle,
    SlideUp,
    Scrolling,
    SlideDown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Signal {
    /// Begin showing the loaded frame.
    Start,
    /// Jump the reveal of the current page to the end.
    Skip,
    /// A further page or queued frame was loaded.
    NextPage,
    /// Nothing left to show; put the box away.
    Dismiss,
    /// The slide schedule ran out.
    SlideFinished,
}

impl TextBoxState {
    /// Pure transition function. Signals that do not apply leave the state
    /// unchanged.
    pub fn transition(self, signal: Signal) -> Self {
        match (self, signal) {
            (Self::Idle, Signal::Start) => Self::SlideUp,
            (Self::SlideUp, Signal::SlideFinished) => Self::Scrolling,
            (Self::Scrolling, Signal::Skip | Signal::NextPage) => Self::Scrolling,
            (Self::Scrolling, Signal::Dismiss) => Self::SlideDown,
            (Self::SlideDown, Signal::SlideFinished) => Self::Idle,
            (state, _) => state,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Idle => "Idle",
            Self::SlideUp => "SlideUp",
            Self::Scrolling => "Scrolling",
            Self::SlideDown => "SlideDown",
        }
    }
}

impl std::fmt::Display for TextBoxState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// What the B button does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BButtonPolicy {
    /// B only advances once the current page is fully revealed.
    #[default]
    CompletedOnly,
    /// B behaves exactly like A.
    SameAsA,
}

/// Rectangle in box-local pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub w: u32,
    pub h: u32,
}

impl Rect {
    pub const fn new(x: i32, y: i32, w: u32, h: u32) -> Self {
        Self { x, y, w, h }
    }

    pub fn origin(&self) -> IVec2 {
        IVec2::new(self.x, self.y)
    }

    fn fits_within(&self, width: u32, height: u32) -> bool {
        self.x >= 0
            && self.y >= 0
            && i64::from(self.x) + i64::from(self.w) <= i64::from(width)
            && i64::from(self.y) + i64::from(self.h) <= i64::from(height)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct TextBoxConfig {
    pub width: u32,
    pub height: u32,
    pub text_rect: Rect,
    pub portrait_rect: Rect,
    pub arrow_rect: Rect,
    /// Frames per reveal step; 0 shows text instantly.
    pub scroll_delay: u32,
    pub slide_schedule: Vec<i32>,
    pub arrow_blink: Vec<i32>,
    pub arrow_blink_frames: u32,
    pub b_button: BButtonPolicy,
}

impl Default for TextBoxConfig {
    fn default() -> Self {
        Self {
            width: 900,
            height: 220,
            text_rect: Rect::new(235, 48, 650, 147),
            portrait_rect: Rect::new(0, 0, 220, 220),
            arrow_rect: Rect::new(850, 160, 26, 45),
            scroll_delay: 1,
            slide_schedule: DEFAULT_SLIDE_SCHEDULE.to_vec(),
            arrow_blink: DEFAULT_ARROW_BLINK.to_vec(),
            arrow_blink_frames: DEFAULT_ARROW_BLINK_FRAMES,
            b_button: BButtonPolicy::default(),
        }
    }
}

impl TextBoxConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.width == 0 || self.height == 0 {
            return Err("Textbox validation failed: width/height must be > 0".to_string());
        }
        if self.text_rect.w == 0 || self.text_rect.h == 0 {
            return Err("Textbox validation failed: text_rect must have a non-zero size".to_string());
        }
        for (name, rect) in [
            ("text_rect", &self.text_rect),
            ("portrait_rect", &self.portrait_rect),
            ("arrow_rect", &self.arrow_rect),
        ] {
            if !rect.fits_within(self.width, self.height) {
                return Err(format!(
                    "Textbox validation failed: {name} lies outside the {}x{} box",
                    self.width, self.height
                ));
            }
        }
        if !(1..=MAX_ARROW_BLINK_FRAMES).contains(&self.arrow_blink_frames) {
            return Err(format!(
                "Textbox validation failed: arrow_blink_frames {} outside 1..={MAX_ARROW_BLINK_FRAMES}",
                self.arrow_blink_frames
            ));
        }
        Ok(())
    }
}

/// One wrapped line and its reveal progress.
#[derive(Debug, Clone)]
pub struct ScrollLine {
    text: String,
    /// Offset of the line's top-left corner inside the text rect.
    origin: IVec2,
    cursor: RevealCursor,
}

impl ScrollLine {
    pub fn new(text: String, origin: IVec2, scroll: bool) -> Self {
        let cursor = if scroll {
            RevealCursor::new(&text)
        } else {
            RevealCursor::completed(&text)
        };
        Self {
            text,
            origin,
            cursor,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn visible(&self) -> &str {
        self.cursor.visible(&self.text)
    }

    pub fn origin(&self) -> IVec2 {
        self.origin
    }

    pub fn is_done(&self) -> bool {
        self.cursor.is_done()
    }

    fn advance(&mut self) {
        self.cursor.advance(&self.text);
    }

    fn finish(&mut self) {
        self.cursor.interrupt();
        self.cursor.advance(&self.text);
    }
}

/// The "next" indicator shown once a page is fully revealed.
#[derive(Debug, Clone)]
pub struct NextArrow {
    visible: bool,
    blink: BlinkCycle,
}

impl NextArrow {
    fn new(config: &TextBoxConfig) -> Self {
        Self {
            visible: false,
            blink: BlinkCycle::new(config.arrow_blink.clone(), config.arrow_blink_frames),
        }
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn offset(&self) -> i32 {
        self.blink.offset()
    }

    fn show(&mut self) {
        self.visible = true;
    }

    fn hide(&mut self) {
        self.visible = false;
        self.blink.reset();
    }
}

pub struct TextBox {
    config: TextBoxConfig,
    bounds: (u32, u32),
    state: TextBoxState,
    slide_offset: i32,
    schedule: SlideSchedule,
    line_height: u32,
    lines: Vec<ScrollLine>,
    /// Pages of the current frame not yet shown.
    pages: VecDeque<Vec<String>>,
    /// Wrapped lines of the current frame and how many fit on a page.
    layout: (Vec<String>, usize),
    /// Byte offset of the shown page within the wrapped frame text.
    page_start: usize,
    current: Option<DialogueFrame>,
    loaded: bool,
    color: Color,
    emote: Option<String>,
    frames: VecDeque<DialogueFrame>,
    cadence: u32,
    arrow: NextArrow,
}

impl TextBox {
    /// A hidden, empty textbox for a display of `bounds` pixels.
    pub fn new(config: TextBoxConfig, bounds: (u32, u32)) -> Self {
        let schedule = SlideSchedule::new(config.slide_schedule.clone());
        let arrow = NextArrow::new(&config);
        Self {
            config,
            bounds,
            state: TextBoxState::Idle,
            slide_offset: 0,
            schedule,
            line_height: 0,
            lines: Vec::new(),
            pages: VecDeque::new(),
            layout: (Vec::new(), 0),
            page_start: 0,
            current: None,
            loaded: false,
            color: DEFAULT_TEXT_COLOR,
            emote: None,
            frames: VecDeque::new(),
            cadence: 0,
            arrow,
        }
    }

    /// Queue frames to be shown after the current one.
    pub fn enqueue(&mut self, frames: impl IntoIterator<Item = DialogueFrame>) {
        self.frames.extend(frames);
    }

    /// Replace the box contents with `frame`, wrapped to the text rect and
    /// split into pages. The first page starts revealing from scratch.
    pub fn set_text<M: TextMeasure + ?Sized>(&mut self, frame: &DialogueFrame, measure: &M) {
        self.line_height = measure.line_height();
        self.layout = self.page_layout(&frame.text, measure);
        let (lines, lines_per_page) = self.layout.clone();
        self.pages = paginate(lines, lines_per_page).into();
        self.color = frame.color;
        self.emote = frame.emote.clone();
        self.current = Some(frame.clone());
        self.page_start = 0;
        self.lines.clear();
        self.loaded = true;
        log::trace!(
            "Textbox loaded frame with {} page(s): {:?}",
            self.pages.len(),
            frame.text
        );
        if !self.show_next_page() {
            self.lines.clear();
            self.arrow.hide();
        }
    }

    /// Handle a pad button. Returns the signal it produced, if any.
    pub fn press<M: TextMeasure + ?Sized>(&mut self, button: Button, measure: &M) -> Option<Signal> {
        let acts_as_a = match button {
            Button::A => true,
            Button::B => match self.config.b_button {
                BButtonPolicy::SameAsA => true,
                BButtonPolicy::CompletedOnly => {
                    self.state == TextBoxState::Scrolling && self.is_revealed()
                }
            },
            _ => false,
        };
        if !acts_as_a {
            return None;
        }

        let signal = match self.state {
            TextBoxState::Idle => {
                if !self.loaded && !self.load_next_frame(measure) {
                    log::debug!("Textbox ignored {button}: nothing to show");
                    return None;
                }
                Signal::Start
            }
            TextBoxState::Scrolling => {
                if !self.is_revealed() {
                    self.finish_page();
                    Signal::Skip
                } else if self.show_next_page() || self.load_next_frame(measure) {
                    Signal::NextPage
                } else {
                    self.arrow.hide();
                    Signal::Dismiss
                }
            }
            TextBoxState::SlideUp | TextBoxState::SlideDown => return None,
        };
        self.apply(signal);
        Some(signal)
    }

    /// Advance one logic frame.
    pub fn update(&mut self) {
        match self.state {
            TextBoxState::Idle => {}
            TextBoxState::SlideUp | TextBoxState::SlideDown => match self.schedule.next() {
                Some(delta) if self.state == TextBoxState::SlideUp => self.slide_offset += delta,
                Some(delta) => self.slide_offset -= delta,
                None => {
                    self.schedule.reset();
                    self.apply(Signal::SlideFinished);
                }
            },
            TextBoxState::Scrolling => {
                self.scroll_step();
                if self.is_revealed() {
                    if self.arrow.is_visible() {
                        self.arrow.blink.tick();
                    } else {
                        self.arrow.show();
                    }
                }
            }
        }
    }

    /// Hide the box immediately and drop all text and queued frames.
    pub fn reset(&mut self) {
        self.state = TextBoxState::Idle;
        self.slide_offset = 0;
        self.schedule.reset();
        self.frames.clear();
        self.unload();
    }

    /// Swap in a new configuration, keeping the current text and queue.
    /// A slide in progress is completed instantly. When the new text rect or
    /// `measure` lays the current frame out differently, it is re-wrapped and
    /// the page holding the text already shown is displayed fully revealed.
    pub fn set_config<M: TextMeasure + ?Sized>(&mut self, config: TextBoxConfig, measure: &M) {
        self.schedule = SlideSchedule::new(config.slide_schedule.clone());
        let visible = self.arrow.is_visible();
        self.arrow = NextArrow::new(&config);
        self.arrow.visible = visible;
        self.config = config;
        match self.state {
            TextBoxState::SlideUp | TextBoxState::SlideDown => self.apply(Signal::SlideFinished),
            TextBoxState::Idle | TextBoxState::Scrolling => {}
        }
        if self.state == TextBoxState::Scrolling {
            self.slide_offset = self.schedule.total();
        }
        self.relayout(measure);
        if self.config.scroll_delay == 0 {
            self.finish_page();
        }
    }

    fn page_layout<M: TextMeasure + ?Sized>(&self, text: &str, measure: &M) -> (Vec<String>, usize) {
        let text_rect = self.config.text_rect;
        let line_height = measure.line_height();
        let lines_per_page = if line_height == 0 {
            usize::MAX
        } else {
            (text_rect.h / line_height).max(1) as usize
        };
        (wrap_lines(text, measure, text_rect.w), lines_per_page)
    }

    fn relayout<M: TextMeasure + ?Sized>(&mut self, measure: &M) {
        let Some(frame) = self.current.clone() else {
            return;
        };
        if measure.line_height() == self.line_height
            && self.page_layout(&frame.text, measure) == self.layout
        {
            return;
        }
        let shown_from = self.page_start;
        self.set_text(&frame, measure);
        while self.page_start + self.page_len() <= shown_from && self.show_next_page() {}
        self.finish_page();
        log::debug!(
            "Textbox re-wrapped current frame into {} line(s)",
            self.layout.0.len()
        );
    }

    fn page_len(&self) -> usize {
        self.lines.iter().map(|line| line.text().len()).sum()
    }

    fn finish_page(&mut self) {
        for line in self.lines.iter_mut().filter(|line| !line.is_done()) {
            line.finish();
        }
    }

    fn apply(&mut self, signal: Signal) {
        let next = self.state.transition(signal);
        if next != self.state {
            log::debug!("Textbox {} -> {} ({:?})", self.state, next, signal);
        }
        self.state = next;
        if next == TextBoxState::Idle {
            self.slide_offset = 0;
            self.unload();
        }
    }

    fn unload(&mut self) {
        self.lines.clear();
        self.pages.clear();
        self.layout = (Vec::new(), 0);
        self.page_start = 0;
        self.current = None;
        self.loaded = false;
        self.emote = None;
        self.cadence = 0;
        self.arrow.hide();
    }

    fn load_next_frame<M: TextMeasure + ?Sized>(&mut self, measure: &M) -> bool {
        match self.frames.pop_front() {
            Some(frame) => {
                self.set_text(&frame, measure);
                true
            }
            None => false,
        }
    }

    fn show_next_page(&mut self) -> bool {
        let Some(page) = self.pages.pop_front() else {
            return false;
        };
        self.page_start += self.page_len();
        let scroll = self.config.scroll_delay > 0;
        let line_height = self.line_height as i32;
        self.lines = page
            .into_iter()
            .enumerate()
            .map(|(idx, text)| ScrollLine::new(text, IVec2::new(0, idx as i32 * line_height), scroll))
            .collect();
        self.cadence = 0;
        self.arrow.hide();
        true
    }

    fn scroll_step(&mut self) {
        let delay = self.config.scroll_delay;
        if delay == 0 {
            return;
        }
        if self.cadence == 0 {
            // Lines reveal strictly in order: only the first incomplete one moves.
            if let Some(line) = self.lines.iter_mut().find(|line| !line.is_done()) {
                line.advance();
            }
            self.cadence = delay - 1;
        } else {
            self.cadence -= 1;
        }
    }

    pub fn state(&self) -> TextBoxState {
        self.state
    }

    pub fn config(&self) -> &TextBoxConfig {
        &self.config
    }

    /// True once every line of the current page is fully shown.
    pub fn is_revealed(&self) -> bool {
        self.lines.iter().all(ScrollLine::is_done)
    }

    pub fn slide_offset(&self) -> i32 {
        self.slide_offset
    }

    /// Top-left corner of the box in display pixels.
    pub fn position(&self) -> IVec2 {
        let x = (i64::from(self.bounds.0) - i64::from(self.config.width)) / 2;
        IVec2::new(x as i32, self.bounds.1 as i32 - self.slide_offset)
    }

    pub fn size(&self) -> (u32, u32) {
        (self.config.width, self.config.height)
    }

    /// Top-left corner of the text rect in display pixels.
    pub fn text_origin(&self) -> IVec2 {
        self.position() + self.config.text_rect.origin()
    }

    pub fn lines(&self) -> &[ScrollLine] {
        &self.lines
    }

    pub fn color(&self) -> Color {
        self.color
    }

    pub fn emote(&self) -> Option<&str> {
        self.emote.as_deref()
    }

    pub fn arrow(&self) -> &NextArrow {
        &self.arrow
    }

    /// Display position of the arrow, if it is showing.
    pub fn arrow_position(&self) -> Option<IVec2> {
        self.arrow.is_visible().then(|| {
            self.position() + self.config.arrow_rect.origin() + IVec2::new(0, self.arrow.offset())
        })
    }

    pub fn queued_frames(&self) -> usize {
        self.frames.len()
    }

    pub fn remaining_pages(&self) -> usize {
        self.pages.len()
    }

    /// Lines fully revealed on the current page, and the page's line count.
    pub fn reveal_progress(&self) -> (usize, usize) {
        let done = self.lines.iter().filter(|line| line.is_done()).count();
        (done, self.lines.len())
    }
}
