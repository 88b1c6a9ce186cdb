use tracing::debug;

use crate::config::GridSize;

/// 1バイトで表現できる値の最大値
const BYTE_MAX: u64 = u8::MAX as u64;

/// 圧縮データを展開する。
///
/// 圧縮データの各バイトは、`max_literal`以下であればレベル値そのもので、`max_literal`より大きければ
/// 直前に展開したレベル値を繰り返す回数（ランレングス）の1桁を表現する。
/// ランレングスは`255 - max_literal`を基数とした桁で記録されており、レベル値の直後から桁が1つずつ
/// 上がる。
/// ランレングスを示すバイトを読み込むたびに、そのバイトが示す桁の値だけで繰り返し回数を計算して、
/// 直前のレベル値を繰り返す。
/// それまでに読み込んだ下位の桁の値は繰り返し回数に加算しない。
///
/// # 引数
///
/// * `compressed` - 圧縮データ
/// * `max_literal` - レベル値として扱うバイトの最大値
/// * `expected_len` - 展開後の格子数
///
/// # 戻り値
///
/// 展開したレベル値
pub fn decode(compressed: &[u8], max_literal: u8, expected_len: usize) -> DecodeResult<Vec<u8>> {
    let mut data = vec![0u8; expected_len];
    let base = BYTE_MAX - max_literal as u64;

    // 次に書き込む位置
    let mut p = 0usize;
    // ランレングスの桁
    let mut run_length_digit = 0u32;
    let mut literals = 0usize;
    let mut run_length_bytes = 0usize;

    for (offset, &val) in compressed.iter().enumerate() {
        // レベル値
        if val <= max_literal {
            if expected_len <= p {
                return Err(DecodeError::Overrun {
                    offset,
                    expected: expected_len,
                });
            }
            data[p] = val;
            p += 1;
            run_length_digit = 0;
            literals += 1;
            continue;
        }

        // ランレングス
        let previous = match p.checked_sub(1) {
            Some(index) => data[index],
            None => return Err(DecodeError::MissingPreviousValue { offset }),
        };
        let run_length = run_length(val, max_literal, base, run_length_digit).ok_or(
            DecodeError::RunLengthOverflow {
                offset,
                digit: run_length_digit,
            },
        )?;
        let end = p
            .checked_add(run_length)
            .filter(|end| *end <= expected_len)
            .ok_or(DecodeError::Overrun {
                offset,
                expected: expected_len,
            })?;
        data[p..end].fill(previous);
        p = end;
        run_length_digit = run_length_digit.saturating_add(1);
        run_length_bytes += 1;
    }

    if p != expected_len {
        return Err(DecodeError::Underrun {
            decoded: p,
            expected: expected_len,
        });
    }
    debug!(
        compressed_bytes = compressed.len(),
        max_literal, literals, run_length_bytes, "圧縮データを展開しました。"
    );

    Ok(data)
}

/// ランレングスを示すバイトから、直前のレベル値を繰り返す回数を計算する。
///
/// 計算結果が`usize`で表現できない場合は`None`を返す。
fn run_length(val: u8, max_literal: u8, base: u64, digit: u32) -> Option<usize> {
    let digit_value = (val - max_literal - 1) as u64;
    let weight = base.checked_pow(digit)?;
    let run_length = digit_value.checked_mul(weight)?;

    usize::try_from(run_length).ok()
}

/// 解析雨量のレベル値を記録した格子
///
/// レベル値0は観測データなし、1は降水なしを示し、値が大きいほど強い雨を示す。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntensityGrid {
    /// 格子の大きさ
    size: GridSize,
    /// 最北西端から行優先で記録したレベル値
    cells: Vec<u8>,
}

impl IntensityGrid {
    /// 圧縮データを展開して格子を構築する。
    ///
    /// # 引数
    ///
    /// * `compressed` - 圧縮データ
    /// * `max_literal` - レベル値として扱うバイトの最大値
    /// * `size` - 格子の大きさ
    ///
    /// # 戻り値
    ///
    /// `IntensityGrid`
    pub fn decode(compressed: &[u8], max_literal: u8, size: GridSize) -> DecodeResult<Self> {
        let cells = decode(compressed, max_literal, size.len())?;

        Ok(Self { size, cells })
    }

    /// 展開済みのレベル値から格子を構築する。
    pub fn from_cells(size: GridSize, cells: Vec<u8>) -> DecodeResult<Self> {
        if cells.len() != size.len() {
            return Err(DecodeError::LengthMismatch {
                actual: cells.len(),
                expected: size.len(),
            });
        }

        Ok(Self { size, cells })
    }

    /// 格子の大きさを返す。
    pub fn size(&self) -> GridSize {
        self.size
    }

    /// 行優先で記録したレベル値を返す。
    pub fn cells(&self) -> &[u8] {
        &self.cells
    }

    /// 格子`(x, y)`のレベル値を返す。
    pub fn get(&self, x: u32, y: u32) -> Option<u8> {
        if self.size.width() <= x || self.size.height() <= y {
            return None;
        }
        self.cells.get(self.size.index(x, y)).copied()
    }

    pub fn into_cells(self) -> Vec<u8> {
        self.cells
    }
}

/// 展開エラー型
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    /// 展開したレベル値が格子数を超えた
    #[error("圧縮データの{offset}バイト目で、展開したレベル値が格子数({expected})を超えました。")]
    Overrun { offset: usize, expected: usize },

    /// 展開したレベル値が格子数に満たない
    ///
    /// 圧縮データが途中で切れている場合に発生する。
    #[error("展開したレベル値の数({decoded})が格子数({expected})に満たません。")]
    Underrun { decoded: usize, expected: usize },

    /// 繰り返すレベル値がない
    #[error("圧縮データの{offset}バイト目のランレングスの前にレベル値が記録されていません。")]
    MissingPreviousValue { offset: usize },

    /// ランレングスが表現できる範囲を超えた
    #[error("圧縮データの{offset}バイト目のランレングス({digit}桁目)が大きすぎます。")]
    RunLengthOverflow { offset: usize, digit: u32 },

    /// レベル値の数と格子数が一致しない
    #[error("レベル値の数({actual})が格子数({expected})と一致しません。")]
    LengthMismatch { actual: usize, expected: usize },
}

/// 展開結果型
pub type DecodeResult<T> = Result<T, DecodeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn literals_are_copied_in_order() {
        let compressed = [0, 1, 2, 3, 4, 5];
        let data = decode(&compressed, 5, 6).unwrap();
        assert_eq!(data, compressed);
    }

    #[test]
    fn run_length_repeats_previous_value() {
        // 251 = 5 + 1 + 245
        let data = decode(&[3, 251], 5, 246).unwrap();
        assert_eq!(data.len(), 246);
        assert!(data.iter().all(|v| *v == 3));
    }

    #[test]
    fn higher_digit_replaces_lower_digit() {
        // 基数250、1桁目で2回、2桁目で3 * 250回
        let data = decode(&[7, 8, 9], 5, 1 + 2 + 750).unwrap();
        assert!(data.iter().all(|v| *v == 7));
    }

    #[test]
    fn literal_resets_run_length_digit() {
        let data = decode(&[1, 8, 2, 8], 5, 6).unwrap();
        assert_eq!(data, vec![1, 1, 1, 2, 2, 2]);
    }

    #[test]
    fn zero_run_length_writes_nothing() {
        let data = decode(&[4, 6, 5], 5, 2).unwrap();
        assert_eq!(data, vec![4, 5]);
    }

    #[test]
    fn max_literal_255_treats_every_byte_as_literal() {
        let compressed = [0, 128, 254, 255];
        let data = decode(&compressed, 255, 4).unwrap();
        assert_eq!(data, compressed);
    }

    #[test]
    fn literal_past_end_is_overrun() {
        assert_eq!(
            decode(&[1, 2, 3], 5, 2),
            Err(DecodeError::Overrun {
                offset: 2,
                expected: 2
            })
        );
    }

    #[test]
    fn run_past_end_is_overrun() {
        assert_eq!(
            decode(&[3, 251], 5, 100),
            Err(DecodeError::Overrun {
                offset: 1,
                expected: 100
            })
        );
    }

    #[test]
    fn short_stream_is_underrun() {
        assert_eq!(
            decode(&[3, 8], 5, 10),
            Err(DecodeError::Underrun {
                decoded: 3,
                expected: 10
            })
        );
    }

    #[test]
    fn run_length_without_previous_value_fails() {
        assert_eq!(
            decode(&[200, 1], 5, 10),
            Err(DecodeError::MissingPreviousValue { offset: 0 })
        );
    }

    #[test]
    fn overflowing_digit_fails() {
        // 基数255の10桁目は`u64`で表現できない
        let mut compressed = vec![0u8];
        compressed.extend(std::iter::repeat(1u8).take(10));
        assert_eq!(
            decode(&compressed, 0, 1),
            Err(DecodeError::RunLengthOverflow {
                offset: 10,
                digit: 9
            })
        );
    }

    #[test]
    fn grid_lookup_uses_row_major_order() {
        let size = GridSize::new(3, 2).unwrap();
        let grid = IntensityGrid::decode(&[0, 1, 2, 3, 4, 5], 10, size).unwrap();
        assert_eq!(grid.get(0, 0), Some(0));
        assert_eq!(grid.get(2, 0), Some(2));
        assert_eq!(grid.get(0, 1), Some(3));
        assert_eq!(grid.get(2, 1), Some(5));
        assert_eq!(grid.get(3, 0), None);
        assert_eq!(grid.get(0, 2), None);
    }

    #[test]
    fn from_cells_rejects_wrong_length() {
        let size = GridSize::new(2, 2).unwrap();
        assert_eq!(
            IntensityGrid::from_cells(size, vec![0; 3]),
            Err(DecodeError::LengthMismatch {
                actual: 3,
                expected: 4
            })
        );
    }
}
