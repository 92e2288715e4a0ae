/// Built-in named color scales as `(position, color)` stops.
pub(crate) const PALETTES: &[(&str, &[(f64, &str)])] = &[
    ("Greys", &[(0.0, "rgb(0,0,0)"), (1.0, "rgb(255,255,255)")]),
    (
        "YlGnBu",
        &[
            (0.0, "rgb(8,29,88)"),
            (0.125, "rgb(37,52,148)"),
            (0.25, "rgb(34,94,168)"),
            (0.375, "rgb(29,145,192)"),
            (0.5, "rgb(65,182,196)"),
            (0.625, "rgb(127,205,187)"),
            (0.75, "rgb(199,233,180)"),
            (0.875, "rgb(237,248,217)"),
            (1.0, "rgb(255,255,217)"),
        ],
    ),
    (
        "Greens",
        &[
            (0.0, "rgb(0,68,27)"),
            (0.125, "rgb(0,109,44)"),
            (0.25, "rgb(35,139,69)"),
            (0.375, "rgb(65,171,93)"),
            (0.5, "rgb(116,196,118)"),
            (0.625, "rgb(161,217,155)"),
            (0.75, "rgb(199,233,192)"),
            (0.875, "rgb(229,245,224)"),
            (1.0, "rgb(247,252,245)"),
        ],
    ),
    (
        "YlOrRd",
        &[
            (0.0, "rgb(128,0,38)"),
            (0.125, "rgb(189,0,38)"),
            (0.25, "rgb(227,26,28)"),
            (0.375, "rgb(252,78,42)"),
            (0.5, "rgb(253,141,60)"),
            (0.625, "rgb(254,178,76)"),
            (0.75, "rgb(254,217,118)"),
            (0.875, "rgb(255,237,160)"),
            (1.0, "rgb(255,255,204)"),
        ],
    ),
    ("Bluered", &[(0.0, "rgb(0,0,255)"), (1.0, "rgb(255,0,0)")]),
    (
        "RdBu",
        &[
            (0.0, "rgb(5,10,172)"),
            (0.35, "rgb(106,137,247)"),
            (0.5, "rgb(190,190,190)"),
            (0.6, "rgb(220,170,132)"),
            (0.7, "rgb(230,145,90)"),
            (1.0, "rgb(178,10,28)"),
        ],
    ),
    (
        "Reds",
        &[
            (0.0, "rgb(220,220,220)"),
            (0.2, "rgb(245,195,157)"),
            (0.4, "rgb(245,160,105)"),
            (1.0, "rgb(178,10,28)"),
        ],
    ),
    (
        "Blues",
        &[
            (0.0, "rgb(5,10,172)"),
            (0.35, "rgb(40,60,190)"),
            (0.5, "rgb(70,100,245)"),
            (0.6, "rgb(90,120,245)"),
            (0.7, "rgb(106,137,247)"),
            (1.0, "rgb(220,220,220)"),
        ],
    ),
    (
        "Picnic",
        &[
            (0.0, "rgb(0,0,255)"),
            (0.1, "rgb(51,153,255)"),
            (0.2, "rgb(102,204,255)"),
            (0.3, "rgb(153,204,255)"),
            (0.4, "rgb(204,204,255)"),
            (0.5, "rgb(255,255,255)"),
            (0.6, "rgb(255,204,255)"),
            (0.7, "rgb(255,153,255)"),
            (0.8, "rgb(255,102,204)"),
            (0.9, "rgb(255,102,102)"),
            (1.0, "rgb(255,0,0)"),
        ],
    ),
    (
        "Portland",
        &[
            (0.0, "rgb(12,51,131)"),
            (0.25, "rgb(10,136,186)"),
            (0.5, "rgb(242,211,56)"),
            (0.75, "rgb(242,143,56)"),
            (1.0, "rgb(217,30,30)"),
        ],
    ),
    (
        "Jet",
        &[
            (0.0, "rgb(0,0,131)"),
            (0.125, "rgb(0,60,170)"),
            (0.375, "rgb(5,255,255)"),
            (0.625, "rgb(255,255,0)"),
            (0.875, "rgb(250,0,0)"),
            (1.0, "rgb(128,0,0)"),
        ],
    ),
    (
        "Hot",
        &[
            (0.0, "rgb(0,0,0)"),
            (0.3, "rgb(230,0,0)"),
            (0.6, "rgb(255,210,0)"),
            (1.0, "rgb(255,255,255)"),
        ],
    ),
    (
        "Blackbody",
        &[
            (0.0, "rgb(0,0,0)"),
            (0.2, "rgb(230,0,0)"),
            (0.4, "rgb(230,210,0)"),
            (0.7, "rgb(255,255,255)"),
            (1.0, "rgb(160,200,255)"),
        ],
    ),
    (
        "Earth",
        &[
            (0.0, "rgb(0,0,130)"),
            (0.1, "rgb(0,180,180)"),
            (0.2, "rgb(40,210,40)"),
            (0.4, "rgb(230,230,50)"),
            (0.6, "rgb(120,70,20)"),
            (1.0, "rgb(255,255,255)"),
        ],
    ),
    (
        "Electric",
        &[
            (0.0, "rgb(0,0,0)"),
            (0.15, "rgb(30,0,100)"),
            (0.4, "rgb(120,0,100)"),
            (0.6, "rgb(160,90,0)"),
            (0.8, "rgb(230,200,0)"),
            (1.0, "rgb(255,250,220)"),
        ],
    ),
    (
        "Viridis",
        &[
            (0.0, "#440154"),
            (0.25, "#3b528b"),
            (0.5, "#21918c"),
            (0.75, "#5ec962"),
            (1.0, "#fde725"),
        ],
    ),
];

/// Used when a color-scale attribute declares no default.
pub(crate) const DEFAULT_PALETTE: &str = "RdBu";

/// Case-insensitive palette lookup.
pub(crate) fn palette(name: &str) -> Option<&'static [(f64, &'static str)]> {
    PALETTES
        .iter()
        .find(|(key, _)| key.eq_ignore_ascii_case(name))
        .map(|(_, stops)| *stops)
}

pub fn palette_names() -> impl Iterator<Item = &'static str> {
    PALETTES.iter().map(|(name, _)| *name)
}
