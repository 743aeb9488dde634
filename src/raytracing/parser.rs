use std::{error::Error, fmt};

use log::error;

use super::{
    camera::Camera,
    core::{Floor, Light, Material, Scene, Sphere},
    Vec3,
};

pub struct SceneParser {
    chars: Vec<char>,
    buffer: String,
    position: FilePosition,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FilePosition {
    pub line: u32,
    pub column: u32,
    index: usize,
}

impl FilePosition {
    fn new() -> Self {
        FilePosition {
            line: 0,
            column: 0,
            index: 0,
        }
    }

    fn on_new_line(self: &mut Self) {
        self.line += 1;
        self.column = 0;
        self.index += 1;
    }

    fn advance(self: &mut Self) {
        self.column += 1;
        self.index += 1;
    }
}

#[derive(Debug)]
pub struct ParserError {
    pub position: FilePosition,
    pub message: String,
}

impl ParserError {
    fn new(message: &str, position: FilePosition) -> ParserError {
        ParserError {
            position,
            message: message.to_string(),
        }
    }

    /// Logs the error followed by the offending line with a caret under the column
    pub fn print_error_location(self: &Self, content: &str) {
        error!("{}", self);
        if let Some(line) = content.lines().nth(self.position.line as usize) {
            eprintln!("{}", line);
            let spacing = " ".repeat(self.position.column as usize);
            eprintln!("{}^", spacing);
        }
    }
}

impl fmt::Display for ParserError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{} at {}:{}",
            self.message,
            self.position.line + 1,
            self.position.column + 1
        )
    }
}

impl Error for ParserError {}

type ParserResult<T> = Result<T, ParserError>;

/// Everything a scene file can describe. The size is optional since it can
/// also come from the command line.
pub struct SceneDescription {
    pub size: Option<(u32, u32)>,
    pub scene: Scene,
}

impl SceneParser {
    pub fn new(content: &str) -> SceneParser {
        SceneParser {
            chars: content.chars().collect(),
            position: FilePosition::new(),
            buffer: String::new(),
        }
    }

    fn get_current_char(self: &Self) -> Option<char> {
        self.chars.get(self.position.index).copied()
    }

    fn is_empty(self: &Self) -> bool {
        self.get_current_char().is_none()
    }

    fn advance(self: &mut Self) -> bool {
        if let Some(current_char) = self.get_current_char() {
            if current_char == '\n' {
                self.position.on_new_line();
            } else {
                self.position.advance();
            }
            return true;
        }
        return false;
    }

    fn advance_until(self: &mut Self, f: impl Fn(char) -> bool) {
        while let Some(current_char) = self.get_current_char() {
            if f(current_char) {
                break;
            }
            self.advance();
        }
    }

    fn eat_spaces(self: &mut Self) {
        // consume all the empty lines, spaces and comments before the next token
        while let Some(current_char) = self.get_current_char() {
            if current_char == '#' {
                // the end of line is consumed at the end of the loop
                self.advance_until(|c| c == '\n');
            } else if !current_char.is_whitespace() {
                break;
            }
            self.advance();
        }
    }

    /// Appends the current char to `result`, advances and returns the next char
    fn enqueue(self: &mut Self, result: &mut String) -> char {
        if let Some(current_char) = self.get_current_char() {
            result.push(current_char);
            self.advance();
        }
        self.get_current_char().unwrap_or(' ')
    }

    fn pop(self: &mut Self) -> String {
        // a peeked token is returned before reading a new one
        if !self.buffer.is_empty() {
            return std::mem::take(&mut self.buffer);
        }

        self.eat_spaces();
        let mut result = String::new();
        let Some(mut current_char) = self.get_current_char() else {
            return result;
        };

        match current_char {
            ',' | '(' | ')' => {
                self.advance();
                result.push(current_char);
            }
            '.' | '+' | '-' | '0'..='9' => {
                if current_char == '+' || current_char == '-' {
                    current_char = self.enqueue(&mut result);
                }
                while current_char.is_ascii_digit() {
                    current_char = self.enqueue(&mut result);
                }
                if current_char == '.' {
                    current_char = self.enqueue(&mut result);
                    while current_char.is_ascii_digit() {
                        current_char = self.enqueue(&mut result);
                    }
                }
            }
            _ if current_char.is_alphabetic() => {
                while current_char.is_alphabetic() {
                    current_char = self.enqueue(&mut result);
                }
            }
            _ => {
                // unknown symbol, returned alone so the caller can report it
                self.enqueue(&mut result);
            }
        }
        result
    }

    fn peek(self: &mut Self) -> &String {
        if self.buffer.is_empty() {
            self.buffer = self.pop();
        }
        &self.buffer
    }

    fn error<T>(self: &Self, message: &str) -> ParserResult<T> {
        Err(ParserError::new(message, self.position))
    }

    fn parse_float(self: &mut Self) -> ParserResult<f64> {
        let next_token = self.pop();
        if let Ok(num) = next_token.parse::<f64>() {
            Ok(num)
        } else {
            let message = format!("cannot interpret '{}' as a number", next_token);
            self.error(&message)
        }
    }

    fn parse_positive(self: &mut Self, what: &str) -> ParserResult<f64> {
        let value = self.parse_float()?;
        if value > 0.0 {
            Ok(value)
        } else {
            self.error(&format!("{} must be positive, got {}", what, value))
        }
    }

    fn parse_dimension(self: &mut Self) -> ParserResult<u32> {
        let value = self.parse_positive("image size")?;
        if value.fract() != 0.0 || value > u32::MAX as f64 {
            return self.error(&format!("image size must be an integer, got {}", value));
        }
        Ok(value as u32)
    }

    fn match_token(self: &mut Self, expected_lexem: &str) -> ParserResult<()> {
        let next_lexem = self.pop();
        if next_lexem != expected_lexem {
            let message = format!(
                "expected '{}', getting '{}' instead",
                expected_lexem, next_lexem
            );
            self.error(&message)
        } else {
            Ok(())
        }
    }

    fn maybe_match(self: &mut Self, expected_lexem: &str) -> bool {
        // consume the next lexem only when it is the expected one
        if self.peek() == expected_lexem {
            self.pop();
            return true;
        }
        return false;
    }

    fn parse_vec3(self: &mut Self) -> ParserResult<Vec3> {
        self.match_token("(")?;
        let x = self.parse_float()?;
        self.match_token(",")?;
        let y = self.parse_float()?;
        self.match_token(",")?;
        let z = self.parse_float()?;
        self.match_token(")")?;
        Ok(Vec3::new(x, y, z))
    }

    fn parse_color(self: &mut Self) -> ParserResult<Vec3> {
        let named = [
            ("red", Vec3::new(1.0, 0.0, 0.0)),
            ("green", Vec3::new(0.0, 1.0, 0.0)),
            ("blue", Vec3::new(0.0, 0.0, 1.0)),
            ("white", Vec3::one()),
            ("black", Vec3::zero()),
            ("gray", Vec3::new(0.6, 0.6, 0.6)),
            ("cyan", Vec3::new(0.0, 1.0, 1.0)),
            ("violet", Vec3::new(1.0, 0.0, 1.0)),
            ("yellow", Vec3::new(1.0, 1.0, 0.0)),
            ("orange", Vec3::new(0.98, 0.45, 0.02)),
        ];
        for (name, color) in named {
            if self.maybe_match(name) {
                return Ok(color);
            }
        }
        self.parse_vec3()
    }

    fn parse_size(self: &mut Self) -> ParserResult<(u32, u32)> {
        self.match_token("size")?;
        let width = self.parse_dimension()?;
        let height = self.parse_dimension()?;
        Ok((width, height))
    }

    fn parse_camera(self: &mut Self) -> ParserResult<Camera> {
        self.match_token("camera")?;
        let mut camera = Camera::default();
        if self.maybe_match("from") {
            camera.position = self.parse_vec3()?;
        }
        if self.maybe_match("distance") {
            camera.distance = self.parse_positive("projection distance")?;
        }
        Ok(camera)
    }

    fn parse_light(self: &mut Self) -> ParserResult<Light> {
        self.match_token("light")?;
        let direction = self.parse_vec3()?;
        if direction.squared_len() == 0.0 {
            return self.error("light direction cannot be a zero vector");
        }
        let intensity = if self.maybe_match("intensity") {
            self.parse_float()?
        } else {
            1.0
        };
        Ok(Light::new(direction, intensity))
    }

    fn parse_sphere(self: &mut Self, defaults: Material) -> ParserResult<Sphere> {
        self.match_token("sphere")?;
        let center = self.parse_vec3()?;
        let radius = self.parse_positive("sphere radius")?;
        let color = self.parse_color()?;
        let mut material = Material { color, ..defaults };
        loop {
            if self.maybe_match("kd") {
                material.kd = self.parse_float()?;
            } else if self.maybe_match("ks") {
                material.ks = self.parse_float()?;
            } else if self.maybe_match("shininess") {
                material.shininess = self.parse_float()?;
            } else {
                break;
            }
        }
        Ok(Sphere {
            center,
            radius,
            material,
        })
    }

    fn parse_floor(self: &mut Self, defaults: Floor) -> ParserResult<Floor> {
        self.match_token("floor")?;
        let mut floor = Floor {
            y: self.parse_float()?,
            ..defaults
        };
        loop {
            if self.maybe_match("cell") {
                floor.cell_size = self.parse_positive("checker cell size")?;
            } else if self.maybe_match("far") {
                floor.far_z = self.parse_float()?;
            } else if self.maybe_match("colors") {
                floor.even_color = self.parse_color()?;
                floor.odd_color = self.parse_color()?;
            } else {
                break;
            }
        }
        Ok(floor)
    }

    /// Main routine that parses the whole file.
    /// Statements can come in any order, the ones left out keep the default scene values.
    pub fn parse_scene(self: &mut Self) -> ParserResult<SceneDescription> {
        let mut scene = Scene::default();
        let mut size = None;
        let mut sphere_seen = false;
        let mut floor_seen = false;

        loop {
            let next_token = self.peek().clone();
            if next_token.is_empty() && self.is_empty() {
                break;
            }
            match next_token.as_str() {
                "size" => size = Some(self.parse_size()?),
                "camera" => scene.camera = self.parse_camera()?,
                "light" => scene.light = self.parse_light()?,
                "ambient" => {
                    self.pop();
                    scene.ambient = self.parse_float()?;
                }
                "background" => {
                    self.pop();
                    scene.background = self.parse_color()?;
                }
                "sphere" => {
                    if sphere_seen {
                        return self.error("the scene already has a sphere");
                    }
                    sphere_seen = true;
                    scene.sphere = self.parse_sphere(scene.sphere.material)?;
                }
                "floor" => {
                    if floor_seen {
                        return self.error("the scene already has a floor");
                    }
                    floor_seen = true;
                    scene.floor = self.parse_floor(scene.floor)?;
                }
                _ => {
                    let message = format!("unexpected token '{}'", next_token);
                    return self.error(&message);
                }
            }
        }
        Ok(SceneDescription { size, scene })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(content: &str) -> ParserResult<SceneDescription> {
        SceneParser::new(content).parse_scene()
    }

    #[test]
    fn empty_file_gives_default_scene() {
        let description = parse("# nothing here\n\n").unwrap();
        assert!(description.size.is_none());
        assert_eq!(description.scene, Scene::default());
    }

    #[test]
    fn full_grammar() {
        let content = "
            size 200 100
            camera from (0, 10, 0) distance 800
            background (0.1, 0.1, 0.2)
            light (0, -1, 0) intensity 0.5 # straight down
            ambient 0.1
            sphere (0, 0, -1000) 100 red kd 0.5 ks 0.3 shininess 8
            floor -100 cell 50 far -2000 colors white black
        ";
        let description = parse(content).unwrap();
        let scene = description.scene;
        assert_eq!(description.size, Some((200, 100)));
        assert_eq!(scene.camera, Camera::new(Vec3::new(0.0, 10.0, 0.0), 800.0));
        assert_eq!(scene.background, Vec3::new(0.1, 0.1, 0.2));
        assert_eq!(scene.light.direction, Vec3::new(0.0, -1.0, 0.0));
        assert_eq!(scene.light.intensity, 0.5);
        assert_eq!(scene.ambient, 0.1);
        assert_eq!(scene.sphere.center, Vec3::new(0.0, 0.0, -1000.0));
        assert_eq!(scene.sphere.radius, 100.0);
        assert_eq!(
            scene.sphere.material,
            Material {
                color: Vec3::new(1.0, 0.0, 0.0),
                kd: 0.5,
                ks: 0.3,
                shininess: 8.0,
            }
        );
        assert_eq!(
            scene.floor,
            Floor {
                y: -100.0,
                far_z: -2000.0,
                cell_size: 50.0,
                even_color: Vec3::one(),
                odd_color: Vec3::zero(),
            }
        );
    }

    #[test]
    fn bundled_scenes_parse() {
        let description = parse(include_str!("../../scenes/checkerboard.scene")).unwrap();
        assert_eq!(description.size, Some((401, 401)));
        assert_eq!(description.scene, Scene::default());

        let description = parse(include_str!("../../scenes/sunset.scene")).unwrap();
        assert_eq!(description.size, Some((640, 360)));
        assert_eq!(description.scene.sphere.material.shininess, 64.0);
    }

    #[test]
    fn omitted_options_keep_defaults() {
        let defaults = Scene::default();
        let scene = parse("sphere (1, 2, -3) 4 (0.5, 0.5, 0.5)\nfloor -4")
            .unwrap()
            .scene;
        assert_eq!(scene.sphere.material.kd, defaults.sphere.material.kd);
        assert_eq!(scene.sphere.material.shininess, 32.0);
        assert_eq!(scene.floor.y, -4.0);
        assert_eq!(scene.floor.cell_size, defaults.floor.cell_size);
        assert_eq!(scene.light, defaults.light);
    }

    #[test]
    fn light_direction_is_normalized() {
        let scene = parse("light (-2, -4, -2)").unwrap().scene;
        assert!((scene.light.direction.len() - 1.0).abs() < 1e-12);
        assert!(parse("light (0, 0, 0)").is_err());
    }

    #[test]
    fn duplicate_sphere_is_rejected() {
        let err = parse("sphere (0, 0, -10) 1 red\nsphere (0, 0, -20) 1 blue")
            .err()
            .unwrap();
        assert!(err.message.contains("already has a sphere"));
        assert_eq!(err.position.line, 1);
    }

    #[test]
    fn unknown_token_reports_position() {
        let err = parse("ambient 0.3\n  teapot (0, 0, 0)").err().unwrap();
        assert_eq!(err.message, "unexpected token 'teapot'");
        assert_eq!(err.position.line, 1);
        assert_eq!(err.to_string(), "unexpected token 'teapot' at 2:9");
    }

    #[test]
    fn bad_numbers() {
        assert!(parse("size 10.5 10").is_err());
        assert!(parse("size 0 10").is_err());
        assert!(parse("sphere (0, 0, -1) -3 red").is_err());
        assert!(parse("camera distance abc").is_err());
        assert!(parse("floor 1 cell 0").is_err());
    }

    #[test]
    fn unknown_symbol_is_an_error() {
        let err = parse("ambient 0.1\n@").err().unwrap();
        assert_eq!(err.message, "unexpected token '@'");
    }
}
