//! Embedded fantasy name fragments. Compiled in so genesis needs no data
//! files and no network, and the same seed always builds the same world.

pub const TOWN_ROOTS: [&str; 20] = [
    "Ashford", "Blackmere", "Caldwick", "Dunmore", "Eastvale", "Farrowgate", "Glenholm",
    "Harrowden", "Ironbridge", "Kelsworth", "Larkmoor", "Milldale", "Northcliff", "Oakhaven",
    "Pennybrook", "Quarrington", "Redmarsh", "Stonefield", "Thornbury", "Wolverdale",
];

pub const CLUB_SUFFIXES: [&str; 8] =
    ["United", "City", "Rovers", "Athletic", "Town", "Wanderers", "Albion", "FC"];

pub const STADIUM_PATTERNS: [&str; 6] =
    ["{} Park", "{} Lane", "The {} Ground", "{} Road", "{} Arena", "{} Meadow"];

pub const FIRST_NAMES: [&str; 24] = [
    "Alex", "Bren", "Cass", "Dario", "Emil", "Flyn", "Gus", "Harlan", "Iker", "Jory", "Kit",
    "Lazar", "Milo", "Nats", "Oren", "Piet", "Quin", "Rafe", "Soren", "Teo", "Ulric", "Vasko",
    "Wren", "Yann",
];

pub const LAST_NAMES: [&str; 28] = [
    "Abbott", "Birch", "Coleford", "Drayton", "Ellery", "Fenwick", "Garrow", "Hollis", "Ingram",
    "Jessop", "Kirkby", "Loxley", "Marsh", "Nettleton", "Osgood", "Pemberton", "Quill",
    "Rowntree", "Satchwell", "Tansley", "Underhill", "Vance", "Wexford", "Yardley", "Zeller",
    "Blythe", "Crane", "Dunbar",
];

pub const OWNER_NAMES: [&str; 12] = [
    "Margaret Holt", "Viktor Sable", "Eleanor Finch", "Bram Kessler", "Ada Thorne",
    "Casimir Vale", "June Okafor", "Reginald Moss", "Petra Lindqvist", "Hugo Ferrant",
    "Willa Crowther", "Dmitri Valen",
];

pub const MEDIA_OUTLETS: [(&str, &str); 3] = [
    ("media-sunday-whistle", "The Sunday Whistle"),
    ("media-national-gazette", "The National Gazette"),
    ("media-terrace-talk", "Terrace Talk"),
];

pub const LEAGUE_NAMES: [(&str, &str); 4] = [
    ("league-north", "Northern Premier Division"),
    ("league-south", "Southern Premier Division"),
    ("league-east", "Eastern Premier Division"),
    ("league-west", "Western Premier Division"),
];
