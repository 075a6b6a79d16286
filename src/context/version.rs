use scan_fmt::scan_fmt;

/// Fallback when the driver's version string cannot be parsed
pub const GLES_2_0: GlVersion = GlVersion::es(2, 0);

/// Version of the GL implementation behind a driver
#[derive(Debug, PartialEq, Clone, Copy)]
pub struct GlVersion {
    /// Major version
    pub major: i32,
    /// Minor version
    pub minor: i32,
    /// Whether this is OpenGL ES (or WebGL) rather than desktop OpenGL
    pub es: bool,
}

impl GlVersion {
    /// A desktop OpenGL version
    pub const fn new(major: i32, minor: i32) -> Self {
        GlVersion {
            major,
            minor,
            es: false,
        }
    }

    /// An OpenGL ES version
    pub const fn es(major: i32, minor: i32) -> Self {
        GlVersion { major, minor, es: true }
    }
}

impl Eq for GlVersion {}

impl Ord for GlVersion {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        match self.major.cmp(&other.major) {
            std::cmp::Ordering::Equal => self.minor.cmp(&other.minor).then(self.es.cmp(&other.es)),
            ord => ord,
        }
    }
}

impl PartialOrd for GlVersion {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl TryFrom<&str> for GlVersion {
    type Error = scan_fmt::parse::ScanError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        scan_fmt!(value, "OpenGL ES {d}.{d}", i32, i32)
            .map(|(major, minor)| GlVersion::es(major, minor))
            .or_else(|_| {
                scan_fmt!(value, "{d}.{d}", i32, i32).map(|(major, minor)| GlVersion::new(major, minor))
            })
    }
}
