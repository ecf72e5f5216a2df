use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(
            Clone, Debug, Serialize, Deserialize, Eq, PartialEq, Ord, PartialOrd, Hash,
        )]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }
    };
}
id_newtype!(RoomId);
id_newtype!(InstructorId);
id_newtype!(StudentId);
id_newtype!(Subject);

impl Subject {
    /// Short prefix used for section ids: two-word subjects contribute the
    /// first three letters of the first word plus the first two of the
    /// second ("Further Maths" -> "FurMa"), anything else its first five.
    pub fn abbrev(&self) -> String {
        let words: Vec<&str> = self.0.split_whitespace().collect();
        if words.len() > 1 {
            let mut s: String = words[0].chars().take(3).collect();
            s.extend(words[1].chars().take(2));
            s
        } else {
            self.0.chars().take(5).collect()
        }
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Day {
    Mon,
    Tue,
    Wed,
    Thu,
    Fri,
}

impl Day {
    pub const ALL: [Day; 5] = [Day::Mon, Day::Tue, Day::Wed, Day::Thu, Day::Fri];

    /// Tuesday carries one extra period; every other day has six.
    pub fn periods(self) -> u8 {
        match self {
            Day::Tue => 7,
            _ => 6,
        }
    }

    pub fn last_period(self) -> u8 {
        self.periods() - 1
    }

    pub fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Day {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Day::Mon => "mon",
            Day::Tue => "tue",
            Day::Wed => "wed",
            Day::Thu => "thu",
            Day::Fri => "fri",
        };
        f.write_str(s)
    }
}

/// One cell coordinate in the weekly schedule.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Slot {
    pub day: Day,
    pub period: u8,
}

impl Slot {
    pub const fn new(day: Day, period: u8) -> Self {
        Self { day, period }
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.day, self.period)
    }
}

/// Every student grid keeps Tuesday's second period for tutorial and
/// Friday's last period free; neither is ever available to a section.
pub const TUTORIAL_SLOT: Slot = Slot::new(Day::Tue, 1);
pub const FREE_SLOT: Slot = Slot::new(Day::Fri, 5);

/// The fixed weekly meeting times of one section: one slot per
/// instructional day.
#[derive(Clone, Debug, Default, Serialize, Deserialize, Eq, PartialEq, Hash)]
#[serde(transparent)]
pub struct SlotPattern(pub Vec<Slot>);

impl SlotPattern {
    pub fn slots(&self) -> &[Slot] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Extended patterns occupy the final period of every non-Friday day;
    /// Monday's last period is the telltale slot.
    pub fn is_extended(&self) -> bool {
        self.0
            .iter()
            .any(|s| s.day == Day::Mon && s.period == Day::Mon.last_period())
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum RoomKind {
    Lab,
    General,
    Art,
    #[serde(rename = "DT Room")]
    DesignTech,
    Drama,
}

#[derive(Clone, Debug, Serialize, Deserialize, Eq, PartialEq)]
pub struct Room {
    pub id: RoomId,
    pub kind: RoomKind,
    pub capacity: u32,
    #[serde(default)]
    pub preferred_subjects: Vec<Subject>,
}

#[derive(Clone, Debug, Serialize, Deserialize, Eq, PartialEq)]
pub struct Instructor {
    pub name: InstructorId,
    #[serde(default)]
    pub subjects: Vec<Subject>,
}

impl Instructor {
    pub fn teaches(&self, subject: &Subject) -> bool {
        self.subjects.contains(subject)
    }
}

/// Immutable resource catalog. Rooms and instructors are shared by
/// reference into the sections that use them; nothing downstream mutates
/// them.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Catalog {
    pub rooms: Vec<Arc<Room>>,
    pub instructors: Vec<Arc<Instructor>>,
    #[serde(default = "default_room_requirements")]
    pub room_requirements: BTreeMap<Subject, RoomKind>,
}

impl Catalog {
    pub fn required_room(&self, subject: &Subject) -> RoomKind {
        self.room_requirements
            .get(subject)
            .copied()
            .unwrap_or(RoomKind::General)
    }

    pub fn qualified_instructors(&self, subject: &Subject) -> Vec<Arc<Instructor>> {
        self.instructors
            .iter()
            .filter(|t| t.teaches(subject))
            .cloned()
            .collect()
    }

    /// Rooms that explicitly prefer the subject take priority; otherwise
    /// any room of the subject's required kind is usable.
    pub fn eligible_rooms(&self, subject: &Subject) -> Vec<Arc<Room>> {
        let preferred: Vec<Arc<Room>> = self
            .rooms
            .iter()
            .filter(|r| r.preferred_subjects.contains(subject))
            .cloned()
            .collect();
        if !preferred.is_empty() {
            return preferred;
        }
        let kind = self.required_room(subject);
        self.rooms
            .iter()
            .filter(|r| r.kind == kind)
            .cloned()
            .collect()
    }
}

pub fn default_room_requirements() -> BTreeMap<Subject, RoomKind> {
    let map = [
        ("Chemistry", RoomKind::Lab),
        ("Physics", RoomKind::Lab),
        ("Biology", RoomKind::Lab),
        ("Computer Science", RoomKind::General),
        ("Economics", RoomKind::General),
        ("History", RoomKind::General),
        ("Accounting", RoomKind::General),
        ("Geography", RoomKind::General),
        ("Business Studies", RoomKind::General),
        ("Psychology", RoomKind::General),
        ("Classics", RoomKind::General),
        ("Sociology", RoomKind::General),
        ("Literature", RoomKind::General),
        ("Language", RoomKind::General),
        ("Maths", RoomKind::General),
        ("Further Maths", RoomKind::General),
        ("Design Technology", RoomKind::DesignTech),
        ("Mixed Media", RoomKind::Art),
        ("Painting", RoomKind::Art),
        ("Music", RoomKind::General),
        ("Drama", RoomKind::Drama),
    ];
    map.into_iter()
        .map(|(s, k)| (Subject::from(s), k))
        .collect()
}

/// One offering of a subject. The pattern starts empty and is set exactly
/// once per solve attempt; the roster never exceeds the room capacity.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Section {
    pub id: String,
    pub subject: Subject,
    pub instructor: Arc<Instructor>,
    pub room: Arc<Room>,
    #[serde(default)]
    pub pattern: SlotPattern,
    #[serde(default)]
    pub roster: Vec<StudentId>,
}

impl Section {
    pub fn has_space(&self) -> bool {
        (self.roster.len() as u32) < self.room.capacity
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, Eq, PartialEq)]
pub enum Cell {
    Empty,
    Tutorial,
    Free,
    Class { subject: Subject, room: RoomId },
}

impl Cell {
    pub fn is_empty(&self) -> bool {
        matches!(self, Cell::Empty)
    }
}

/// One student's week: a row of cells per day, sized by that day's period
/// count, with the two reserved markers pre-filled.
#[derive(Clone, Debug, Serialize, Deserialize, Eq, PartialEq)]
pub struct ScheduleGrid {
    days: Vec<Vec<Cell>>,
}

impl ScheduleGrid {
    pub fn new() -> Self {
        let mut days = Vec::with_capacity(Day::ALL.len());
        for day in Day::ALL {
            days.push(vec![Cell::Empty; day.periods() as usize]);
        }
        let mut grid = Self { days };
        grid.set(TUTORIAL_SLOT, Cell::Tutorial);
        grid.set(FREE_SLOT, Cell::Free);
        grid
    }

    pub fn cell(&self, slot: Slot) -> &Cell {
        &self.days[slot.day.index()][slot.period as usize]
    }

    pub fn set(&mut self, slot: Slot, cell: Cell) {
        self.days[slot.day.index()][slot.period as usize] = cell;
    }

    pub fn clear(&mut self, slot: Slot) {
        self.set(slot, Cell::Empty);
    }

    pub fn is_free(&self, slot: Slot) -> bool {
        self.cell(slot).is_empty()
    }

    pub fn row(&self, day: Day) -> &[Cell] {
        &self.days[day.index()]
    }
}

impl Default for ScheduleGrid {
    fn default() -> Self {
        Self::new()
    }
}

pub type StudentRequests = BTreeMap<StudentId, Vec<Subject>>;

/// A student the search gave up on: the subject it stalled at plus the
/// full request list in the order the search tried it.
#[derive(Clone, Debug, Serialize, Deserialize, Eq, PartialEq)]
pub struct FailedRequest {
    pub student: StudentId,
    pub failed_at: Subject,
    pub requested: Vec<Subject>,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct SolveParams {
    pub seed: u64,
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
}

fn default_max_attempts() -> u32 {
    200
}

impl Default for SolveParams {
    fn default() -> Self {
        Self {
            seed: 0,
            max_attempts: default_max_attempts(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SolveEnvelope {
    pub catalog: Catalog,
    pub requests: StudentRequests,
    pub params: SolveParams,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Violation {
    pub kind: String,
    pub details: serde_json::Value,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SolveResult {
    pub status: String,
    pub sections: Vec<Section>,
    /// `None` marks a student the search could not schedule.
    pub schedules: BTreeMap<StudentId, Option<ScheduleGrid>>,
    pub failed: Vec<FailedRequest>,
    pub attempts: u32,
    pub stats: serde_json::Value,
}
