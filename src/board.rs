//! Authoritative checkers rules engine: legal-move generation, mandatory
//! capture, multi-jump continuation, promotion timing and win detection.
//!
//! Pieces live in a flat arena (`Board::pieces`) instead of holding a
//! back-pointer to their board; every other structure references a piece by
//! its location or by membership in a per-player id set.

use std::collections::{HashMap, HashSet};
use std::fmt;

use crate::error::BoardError;

pub type Pos = (i32, i32);

const NEUTRAL_ROWS: i32 = 2;
pub const DEFAULT_DIM: i32 = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Player {
    Black,
    Red,
}

impl Player {
    pub fn opponent(self) -> Player {
        match self {
            Player::Black => Player::Red,
            Player::Red => Player::Black,
        }
    }

    /// Forward row delta for a man of this player.
    fn forward_dy(self) -> i32 {
        match self {
            Player::Black => 1,
            Player::Red => -1,
        }
    }

    /// Row a man of this player promotes on.
    fn promotion_row(self, dim: i32) -> i32 {
        match self {
            Player::Black => dim - 1,
            Player::Red => 0,
        }
    }
}

impl fmt::Display for Player {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Player::Black => write!(f, "black"),
            Player::Red => write!(f, "red"),
        }
    }
}

impl std::str::FromStr for Player {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "black" => Ok(Player::Black),
            "red" => Ok(Player::Red),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PieceId(usize);

#[derive(Debug, Clone)]
struct Piece {
    player: Player,
    king: bool,
    location: Option<Pos>,
}

impl Piece {
    fn repr(&self) -> char {
        let base = match self.player {
            Player::Black => 'b',
            Player::Red => 'r',
        };
        if self.king {
            base.to_ascii_uppercase()
        } else {
            base
        }
    }

    fn from_repr(c: char) -> Option<(Player, bool)> {
        let player = match c.to_ascii_lowercase() {
            'b' => Player::Black,
            'r' => Player::Red,
            _ => return None,
        };
        Some((player, c.is_ascii_uppercase()))
    }
}

/// Piece count and position snapshot, returned by `Board::piece_at`.
#[derive(Debug, Clone, Copy)]
pub struct PieceInfo {
    pub player: Player,
    pub king: bool,
    pub location: Pos,
}

pub struct Board {
    dim: i32,
    usable_positions: HashSet<Pos>,

    moves: HashMap<Player, HashMap<Pos, HashSet<Pos>>>,
    king_moves: HashMap<Pos, HashSet<Pos>>,
    jumps: HashMap<Player, HashMap<Pos, HashSet<Pos>>>,
    king_jumps: HashMap<Pos, HashSet<Pos>>,
    captures: HashMap<(Pos, Pos), Pos>,

    pieces: Vec<Piece>,
    loc_pieces: HashMap<Pos, PieceId>,
    player_pieces: HashMap<Player, HashSet<PieceId>>,

    pub turn: Player,
    last_jump_target: Option<Pos>,
}

impl Board {
    pub fn new(dim: i32) -> Self {
        let usable_positions: HashSet<Pos> = (0..dim)
            .flat_map(|y| ((y + 1) % 2..dim).step_by(2).map(move |x| (x, y)))
            .collect();

        let mut moves: HashMap<Player, HashMap<Pos, HashSet<Pos>>> = HashMap::new();
        moves.insert(Player::Black, HashMap::new());
        moves.insert(Player::Red, HashMap::new());
        let mut jumps: HashMap<Player, HashMap<Pos, HashSet<Pos>>> = HashMap::new();
        jumps.insert(Player::Black, HashMap::new());
        jumps.insert(Player::Red, HashMap::new());
        let mut king_moves = HashMap::new();
        let mut king_jumps = HashMap::new();
        let mut captures = HashMap::new();

        for &pos in &usable_positions {
            let (px, py) = pos;
            for player in [Player::Black, Player::Red] {
                let mov_dy = player.forward_dy();
                let jmp_dy = mov_dy * 2;
                let mut mov_set = HashSet::new();
                let mut jmp_set = HashSet::new();
                for mov_dx in [-1, 1] {
                    let jmp_dx = mov_dx * 2;
                    let mov_loc = (px + mov_dx, py + mov_dy);
                    let jmp_loc = (px + jmp_dx, py + jmp_dy);
                    if usable_positions.contains(&mov_loc) {
                        mov_set.insert(mov_loc);
                    }
                    if usable_positions.contains(&jmp_loc) {
                        jmp_set.insert(jmp_loc);
                        captures.insert((pos, jmp_loc), mov_loc);
                    }
                }
                moves.get_mut(&player).unwrap().insert(pos, mov_set);
                jumps.get_mut(&player).unwrap().insert(pos, jmp_set);
            }
            let king_mov: HashSet<Pos> = moves[&Player::Black][&pos]
                .union(&moves[&Player::Red][&pos])
                .copied()
                .collect();
            let king_jmp: HashSet<Pos> = jumps[&Player::Black][&pos]
                .union(&jumps[&Player::Red][&pos])
                .copied()
                .collect();
            king_moves.insert(pos, king_mov);
            king_jumps.insert(pos, king_jmp);
        }

        let mut player_pieces = HashMap::new();
        player_pieces.insert(Player::Black, HashSet::new());
        player_pieces.insert(Player::Red, HashSet::new());

        Board {
            dim,
            usable_positions,
            moves,
            king_moves,
            jumps,
            king_jumps,
            captures,
            pieces: Vec::new(),
            loc_pieces: HashMap::new(),
            player_pieces,
            turn: Player::Black,
            last_jump_target: None,
        }
    }

    fn player_rows(&self) -> i32 {
        (self.dim - NEUTRAL_ROWS) / 2
    }

    /// `(player, x, y)` triples for the standard starting layout.
    pub fn start_positions(&self) -> Vec<(Player, i32, i32)> {
        let rows = self.player_rows();
        let mut out = Vec::new();
        for &(x, y) in &self.usable_positions {
            if y < rows {
                out.push((Player::Black, x, y));
            } else if y >= self.dim - rows {
                out.push((Player::Red, x, y));
            }
        }
        out
    }

    pub fn usable_positions(&self) -> &HashSet<Pos> {
        &self.usable_positions
    }

    pub fn dim(&self) -> i32 {
        self.dim
    }

    fn valid_placement(&self, location: Pos) -> bool {
        self.usable_positions.contains(&location) && !self.loc_pieces.contains_key(&location)
    }

    pub fn add_piece(&mut self, player: Player, location: Pos) -> Result<PieceId, BoardError> {
        if !self.valid_placement(location) {
            return Err(BoardError::InvalidPlacement {
                x: location.0,
                y: location.1,
            });
        }
        let id = PieceId(self.pieces.len());
        self.pieces.push(Piece {
            player,
            king: false,
            location: Some(location),
        });
        self.loc_pieces.insert(location, id);
        self.player_pieces.get_mut(&player).unwrap().insert(id);
        Ok(id)
    }

    pub fn contains(&self, loc: Pos) -> bool {
        self.loc_pieces.contains_key(&loc)
    }

    pub fn piece_at(&self, loc: Pos) -> Option<PieceInfo> {
        self.loc_pieces.get(&loc).map(|id| {
            let p = &self.pieces[id.0];
            PieceInfo {
                player: p.player,
                king: p.king,
                location: loc,
            }
        })
    }

    pub fn winner(&self) -> Option<Player> {
        let black = self.player_pieces[&Player::Black].len();
        let red = self.player_pieces[&Player::Red].len();
        if black > 0 && red == 0 {
            Some(Player::Black)
        } else if red > 0 && black == 0 {
            Some(Player::Red)
        } else {
            None
        }
    }

    fn applicable_moves(&self, player: Player, king: bool, src: Pos) -> &HashSet<Pos> {
        if king {
            &self.king_moves[&src]
        } else {
            &self.moves[&player][&src]
        }
    }

    fn applicable_jumps(&self, player: Player, king: bool, src: Pos) -> &HashSet<Pos> {
        if king {
            &self.king_jumps[&src]
        } else {
            &self.jumps[&player][&src]
        }
    }

    fn valid_jump(&self, src: Pos, dst: Pos) -> bool {
        if !self.contains(src) || self.contains(dst) {
            return false;
        }
        let piece = self.piece_at(src).unwrap();
        let jumps = self.applicable_jumps(piece.player, piece.king, src);
        if !jumps.contains(&dst) {
            return false;
        }
        match self.captures.get(&(src, dst)) {
            Some(&capture) => match self.piece_at(capture) {
                Some(captured) => captured.player == piece.player.opponent(),
                None => false,
            },
            None => false,
        }
    }

    /// Returns whether `src → dst` is legal given mandatory-capture rules.
    pub fn valid_move(&self, src: Pos, dst: Pos) -> bool {
        if !self.contains(src) || self.contains(dst) {
            return false;
        }
        let piece = self.piece_at(src).unwrap();
        let moves = self.applicable_moves(piece.player, piece.king, src);
        (!self.possible_jump(piece.player) && moves.contains(&dst)) || self.valid_jump(src, dst)
    }

    fn possible_jump_from(&self, src: Pos) -> bool {
        let Some(piece) = self.piece_at(src) else {
            return false;
        };
        self.applicable_jumps(piece.player, piece.king, src)
            .iter()
            .any(|&dst| self.valid_jump(src, dst))
    }

    fn possible_jump(&self, player: Player) -> bool {
        self.player_pieces[&player]
            .iter()
            .any(|id| self.possible_jump_from(self.pieces[id.0].location.unwrap()))
    }

    fn possible_move_from(&self, src: Pos) -> bool {
        let Some(piece) = self.piece_at(src) else {
            return false;
        };
        let has_simple = self
            .applicable_moves(piece.player, piece.king, src)
            .iter()
            .any(|&dst| self.valid_move(src, dst));
        has_simple || self.possible_jump_from(src)
    }

    fn possible_move(&self, player: Player) -> bool {
        self.player_pieces[&player]
            .iter()
            .any(|id| self.possible_move_from(self.pieces[id.0].location.unwrap()))
    }

    fn update_turn(&mut self) {
        let jump_continues = self
            .last_jump_target
            .is_some_and(|target| self.possible_jump_from(target));
        if !jump_continues && self.possible_move(self.turn.opponent()) {
            self.turn = self.turn.opponent();
        }
    }

    fn king_piece(&mut self, id: PieceId) {
        let piece = &mut self.pieces[id.0];
        if !piece.king {
            let (_, y) = piece.location.expect("piece on board");
            if y == piece.player.promotion_row(self.dim) {
                piece.king = true;
            }
        }
    }

    /// Precondition: `valid_move(src, dst)` held. Performs the move, updates
    /// turn, and promotes — in that order — returning the captured piece's
    /// location, if any.
    fn perform_move(&mut self, src: Pos, dst: Pos) -> Option<Pos> {
        let id = self.loc_pieces[&src];
        let piece = self.piece_at(src).unwrap();
        let jumps = self.applicable_jumps(piece.player, piece.king, src);
        let mut captured = None;

        if jumps.contains(&dst) {
            let capture_loc = self.captures[&(src, dst)];
            let captured_id = self.loc_pieces.remove(&capture_loc).unwrap();
            self.player_pieces
                .get_mut(&self.pieces[captured_id.0].player)
                .unwrap()
                .remove(&captured_id);
            self.pieces[captured_id.0].location = None;
            captured = Some(capture_loc);
            self.last_jump_target = Some(dst);
        } else {
            self.last_jump_target = None;
        }

        self.loc_pieces.remove(&src);
        self.loc_pieces.insert(dst, id);
        self.pieces[id.0].location = Some(dst);

        self.update_turn();
        self.king_piece(id);

        captured
    }

    /// Moves the piece at `src` to `dst`. Errs with `InvalidMove` if the move
    /// is not legal for the player whose turn it is.
    pub fn do_move(&mut self, src: Pos, dst: Pos) -> Result<Option<Pos>, BoardError> {
        let owner_matches = self.piece_at(src).is_some_and(|p| p.player == self.turn);
        if !owner_matches || !self.valid_move(src, dst) {
            return Err(BoardError::InvalidMove {
                sx: src.0,
                sy: src.1,
                dx: dst.0,
                dy: dst.1,
            });
        }
        Ok(self.perform_move(src, dst))
    }

    /// Whether the piece now at `loc` is a king. Used by callers that need to
    /// compare before/after a move to detect promotion.
    pub fn is_king(&self, loc: Pos) -> bool {
        self.piece_at(loc).is_some_and(|p| p.king)
    }

    fn clear(&mut self) {
        self.pieces.clear();
        self.loc_pieces.clear();
        self.player_pieces.get_mut(&Player::Black).unwrap().clear();
        self.player_pieces.get_mut(&Player::Red).unwrap().clear();
        self.turn = Player::Black;
        self.last_jump_target = None;
    }

    fn load_lines(&mut self, lines: &[&str]) -> Result<(), BoardError> {
        self.clear();
        for (row, line) in lines.iter().enumerate() {
            for (col, c) in line.chars().enumerate() {
                if let Some((player, king)) = Piece::from_repr(c) {
                    let id = self.add_piece(player, (col as i32, row as i32))?;
                    if king {
                        self.pieces[id.0].king = true;
                    }
                }
            }
        }
        Ok(())
    }

    /// Loads the `|`-separated wire form into this board. Turn and
    /// multi-jump state are not encoded and reset to a fresh game's values.
    pub fn load_wire(&mut self, s: &str) -> Result<(), BoardError> {
        let lines: Vec<&str> = s.split('|').filter(|l| !l.is_empty()).collect();
        self.load_lines(&lines)
    }

    /// Parses a fresh board from its human-readable (`\n`-separated) form.
    pub fn from_str_human(s: &str) -> Result<Self, BoardError> {
        let lines: Vec<&str> = s.split('\n').filter(|l| !l.is_empty()).collect();
        let dim = lines.first().map(|l| l.chars().count() as i32).unwrap_or(DEFAULT_DIM);
        let mut board = Board::new(dim);
        board.load_lines(&lines)?;
        Ok(board)
    }

    fn render_row(&self, y: i32) -> String {
        (0..self.dim)
            .map(|x| match self.piece_at((x, y)) {
                Some(info) => {
                    let p = Piece {
                        player: info.player,
                        king: info.king,
                        location: None,
                    };
                    p.repr()
                }
                None => '*',
            })
            .collect()
    }

    /// `|`-separated wire serialization.
    pub fn to_wire(&self) -> String {
        (0..self.dim)
            .map(|y| self.render_row(y))
            .collect::<Vec<_>>()
            .join("|")
    }

    /// `\n`-separated human-readable serialization, trailing newline.
    pub fn to_human(&self) -> String {
        let mut s = (0..self.dim)
            .map(|y| self.render_row(y))
            .collect::<Vec<_>>()
            .join("\n");
        s.push('\n');
        s
    }
}

impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_human())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fresh() -> Board {
        let mut b = Board::new(DEFAULT_DIM);
        for (player, x, y) in b.start_positions() {
            b.add_piece(player, (x, y)).unwrap();
        }
        b
    }

    #[test]
    fn starting_piece_count() {
        let b = fresh();
        assert_eq!(b.player_pieces[&Player::Black].len(), 12);
        assert_eq!(b.player_pieces[&Player::Red].len(), 12);
    }

    #[test]
    fn opening_move_no_capture() {
        let mut b = fresh();
        assert!(b.valid_move((1, 2), (0, 3)));
        let captured = b.do_move((1, 2), (0, 3)).unwrap();
        assert!(captured.is_none());
        assert_eq!(b.turn, Player::Red);
    }

    #[test]
    fn wire_round_trip() {
        let b = fresh();
        let wire = b.to_wire();
        let mut reloaded = Board::new(DEFAULT_DIM);
        reloaded.load_wire(&wire).unwrap();
        assert_eq!(reloaded.to_wire(), wire);
    }

    #[test]
    fn human_round_trip() {
        let b = fresh();
        let human = b.to_human();
        let reloaded = Board::from_str_human(&human).unwrap();
        assert_eq!(reloaded.to_human(), human);
    }

    #[test]
    fn mandatory_capture_rejects_simple_move() {
        let mut b = Board::new(DEFAULT_DIM);
        b.add_piece(Player::Black, (2, 1)).unwrap();
        b.add_piece(Player::Red, (3, 2)).unwrap();
        b.add_piece(Player::Black, (1, 0)).unwrap();
        b.add_piece(Player::Red, (1, 6)).unwrap();
        assert!(!b.valid_move((1, 0), (0, 1)));
        assert!(b.valid_move((2, 1), (4, 3)));
        let captured = b.do_move((2, 1), (4, 3)).unwrap();
        assert_eq!(captured, Some((3, 2)));
        assert_eq!(b.turn, Player::Red);
    }

    #[test]
    fn multi_jump_keeps_turn() {
        let mut b = Board::new(DEFAULT_DIM);
        b.add_piece(Player::Black, (2, 1)).unwrap();
        b.add_piece(Player::Red, (3, 2)).unwrap();
        b.add_piece(Player::Red, (5, 4)).unwrap();
        b.add_piece(Player::Red, (1, 6)).unwrap();
        b.do_move((2, 1), (4, 3)).unwrap();
        assert_eq!(b.turn, Player::Black, "multi-jump continuation keeps turn");
        let captured = b.do_move((4, 3), (6, 5)).unwrap();
        assert_eq!(captured, Some((5, 4)));
        assert_eq!(b.turn, Player::Red);
    }

    #[test]
    fn promotion_after_turn_resolves() {
        let mut b = Board::new(DEFAULT_DIM);
        b.add_piece(Player::Black, (3, 6)).unwrap();
        b.add_piece(Player::Red, (5, 2)).unwrap();
        let was_king = b.is_king((3, 6));
        b.do_move((3, 6), (4, 7)).unwrap();
        assert!(!was_king);
        assert!(b.is_king((4, 7)));
        assert_eq!(b.turn, Player::Red);
    }

    #[test]
    fn winner_detection() {
        let mut b = Board::new(DEFAULT_DIM);
        b.add_piece(Player::Black, (2, 1)).unwrap();
        b.add_piece(Player::Red, (3, 2)).unwrap();
        b.do_move((2, 1), (4, 3)).unwrap();
        assert_eq!(b.winner(), Some(Player::Black));
    }
}
