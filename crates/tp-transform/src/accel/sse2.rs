//! SSE2 kernels. SSE2 is part of the x86_64 baseline, so no runtime
//! detection is needed. Each kernel handles the tail with the scalar rule.

use std::arch::x86_64::{
    __m128i, _mm_add_epi16, _mm_add_epi32, _mm_add_epi64, _mm_add_epi8, _mm_add_pd, _mm_add_ps,
    _mm_and_si128, _mm_cmpeq_epi32, _mm_cvtepi32_pd, _mm_cvtepi32_ps, _mm_cvtpd_ps,
    _mm_cvtps_pd, _mm_cvttpd_epi32, _mm_cvttps_epi32, _mm_div_pd, _mm_div_ps, _mm_loadu_pd,
    _mm_loadu_ps, _mm_loadu_si128, _mm_movehl_ps, _mm_movelh_ps, _mm_movemask_epi8,
    _mm_mul_epu32, _mm_mul_pd, _mm_mul_ps, _mm_mullo_epi16, _mm_packs_epi32, _mm_packus_epi16,
    _mm_set1_epi16, _mm_set1_epi32, _mm_set1_epi64x, _mm_set1_epi8, _mm_set1_pd, _mm_set1_ps,
    _mm_setzero_si128, _mm_shuffle_epi32, _mm_slli_epi32, _mm_srai_epi16, _mm_srai_epi32,
    _mm_srli_epi64, _mm_srli_si128, _mm_storel_epi64, _mm_storeu_pd, _mm_storeu_ps,
    _mm_storeu_si128, _mm_unpackhi_epi16, _mm_unpackhi_epi8, _mm_unpacklo_epi16,
    _mm_unpacklo_epi32, _mm_unpacklo_epi8,
};

macro_rules! float_kernel {
    ($name:ident, $t:ty, $lanes:expr, $set1:ident, $load:ident, $store:ident, $op:ident, $scalar:tt) => {
        pub(super) fn $name(data: &mut [$t], c: $t) {
            let mut i = 0usize;
            unsafe {
                let vc = $set1(c);
                while i + $lanes <= data.len() {
                    let v = $load(data.as_ptr().add(i));
                    $store(data.as_mut_ptr().add(i), $op(v, vc));
                    i += $lanes;
                }
            }
            for x in &mut data[i..] {
                *x = *x $scalar c;
            }
        }
    };
}

float_kernel!(add_f32, f32, 4, _mm_set1_ps, _mm_loadu_ps, _mm_storeu_ps, _mm_add_ps, +);
float_kernel!(mul_f32, f32, 4, _mm_set1_ps, _mm_loadu_ps, _mm_storeu_ps, _mm_mul_ps, *);
float_kernel!(div_f32, f32, 4, _mm_set1_ps, _mm_loadu_ps, _mm_storeu_ps, _mm_div_ps, /);
float_kernel!(add_f64, f64, 2, _mm_set1_pd, _mm_loadu_pd, _mm_storeu_pd, _mm_add_pd, +);
float_kernel!(mul_f64, f64, 2, _mm_set1_pd, _mm_loadu_pd, _mm_storeu_pd, _mm_mul_pd, *);
float_kernel!(div_f64, f64, 2, _mm_set1_pd, _mm_loadu_pd, _mm_storeu_pd, _mm_div_pd, /);

macro_rules! int_kernel {
    ($name:ident, $t:ty, $lanes:expr, $splat:expr, $op:ident, $scalar:ident) => {
        pub(super) fn $name(data: &mut [$t], c: $t) {
            let mut i = 0usize;
            unsafe {
                let vc = $splat(c);
                while i + $lanes <= data.len() {
                    let p = data.as_mut_ptr().add(i) as *mut __m128i;
                    _mm_storeu_si128(p, $op(_mm_loadu_si128(p), vc));
                    i += $lanes;
                }
            }
            for x in &mut data[i..] {
                *x = x.$scalar(c);
            }
        }
    };
}

int_kernel!(add_u8, u8, 16, |c: u8| _mm_set1_epi8(c as i8), _mm_add_epi8, wrapping_add);
int_kernel!(add_u16, u16, 8, |c: u16| _mm_set1_epi16(c as i16), _mm_add_epi16, wrapping_add);
int_kernel!(add_u32, u32, 4, |c: u32| _mm_set1_epi32(c as i32), _mm_add_epi32, wrapping_add);
int_kernel!(add_u64, u64, 2, |c: u64| _mm_set1_epi64x(c as i64), _mm_add_epi64, wrapping_add);
int_kernel!(mul_u16, u16, 8, |c: u16| _mm_set1_epi16(c as i16), _mm_mullo_epi16, wrapping_mul);
int_kernel!(mul_u32, u32, 4, |c: u32| _mm_set1_epi32(c as i32), mullo_epi32, wrapping_mul);

/// Low 32 bits of each lane product; SSE2 has no `pmulld`.
#[inline(always)]
unsafe fn mullo_epi32(a: __m128i, b: __m128i) -> __m128i {
    let even = _mm_mul_epu32(a, b);
    let odd = _mm_mul_epu32(_mm_srli_epi64(a, 32), _mm_srli_epi64(b, 32));
    _mm_unpacklo_epi32(
        _mm_shuffle_epi32(even, 0b00_00_10_00),
        _mm_shuffle_epi32(odd, 0b00_00_10_00),
    )
}

/// 8-bit multiply through 16-bit lanes; only the low byte of each product
/// is kept.
pub(super) fn mul_u8(data: &mut [u8], c: u8) {
    let mut i = 0usize;
    unsafe {
        let zero = _mm_setzero_si128();
        let mask = _mm_set1_epi16(0x00FF);
        let vc = _mm_set1_epi16(c as i16);
        while i + 16 <= data.len() {
            let p = data.as_mut_ptr().add(i) as *mut __m128i;
            let v = _mm_loadu_si128(p);
            let lo = _mm_and_si128(_mm_mullo_epi16(_mm_unpacklo_epi8(v, zero), vc), mask);
            let hi = _mm_and_si128(_mm_mullo_epi16(_mm_unpackhi_epi8(v, zero), vc), mask);
            _mm_storeu_si128(p, _mm_packus_epi16(lo, hi));
            i += 16;
        }
    }
    for x in &mut data[i..] {
        *x = x.wrapping_mul(c);
    }
}

pub(super) fn i32_to_f32(src: &[i32], out: &mut [f32]) {
    assert_eq!(src.len(), out.len());
    let mut i = 0usize;
    unsafe {
        while i + 4 <= src.len() {
            let v = _mm_loadu_si128(src.as_ptr().add(i) as *const __m128i);
            _mm_storeu_ps(out.as_mut_ptr().add(i), _mm_cvtepi32_ps(v));
            i += 4;
        }
    }
    for (o, &x) in out[i..].iter_mut().zip(&src[i..]) {
        *o = x as f32;
    }
}

pub(super) fn i32_to_f64(src: &[i32], out: &mut [f64]) {
    assert_eq!(src.len(), out.len());
    let mut i = 0usize;
    unsafe {
        while i + 4 <= src.len() {
            let v = _mm_loadu_si128(src.as_ptr().add(i) as *const __m128i);
            _mm_storeu_pd(out.as_mut_ptr().add(i), _mm_cvtepi32_pd(v));
            _mm_storeu_pd(out.as_mut_ptr().add(i + 2), _mm_cvtepi32_pd(_mm_srli_si128(v, 8)));
            i += 4;
        }
    }
    for (o, &x) in out[i..].iter_mut().zip(&src[i..]) {
        *o = f64::from(x);
    }
}

pub(super) fn f32_to_f64(src: &[f32], out: &mut [f64]) {
    assert_eq!(src.len(), out.len());
    let mut i = 0usize;
    unsafe {
        while i + 4 <= src.len() {
            let v = _mm_loadu_ps(src.as_ptr().add(i));
            _mm_storeu_pd(out.as_mut_ptr().add(i), _mm_cvtps_pd(v));
            _mm_storeu_pd(out.as_mut_ptr().add(i + 2), _mm_cvtps_pd(_mm_movehl_ps(v, v)));
            i += 4;
        }
    }
    for (o, &x) in out[i..].iter_mut().zip(&src[i..]) {
        *o = f64::from(x);
    }
}

pub(super) fn f64_to_f32(src: &[f64], out: &mut [f32]) {
    assert_eq!(src.len(), out.len());
    let mut i = 0usize;
    unsafe {
        while i + 4 <= src.len() {
            let lo = _mm_cvtpd_ps(_mm_loadu_pd(src.as_ptr().add(i)));
            let hi = _mm_cvtpd_ps(_mm_loadu_pd(src.as_ptr().add(i + 2)));
            _mm_storeu_ps(out.as_mut_ptr().add(i), _mm_movelh_ps(lo, hi));
            i += 4;
        }
    }
    for (o, &x) in out[i..].iter_mut().zip(&src[i..]) {
        *o = x as f32;
    }
}

/// Truncating conversion. `cvttps` yields `i32::MIN` for NaN and out of
/// range lanes; those blocks are redone with the saturating scalar rule.
pub(super) fn f32_to_i32(src: &[f32], out: &mut [i32]) {
    assert_eq!(src.len(), out.len());
    let mut i = 0usize;
    unsafe {
        let indefinite = _mm_set1_epi32(i32::MIN);
        while i + 4 <= src.len() {
            let r = _mm_cvttps_epi32(_mm_loadu_ps(src.as_ptr().add(i)));
            _mm_storeu_si128(out.as_mut_ptr().add(i) as *mut __m128i, r);
            if _mm_movemask_epi8(_mm_cmpeq_epi32(r, indefinite)) != 0 {
                for j in i..i + 4 {
                    out[j] = src[j] as i32;
                }
            }
            i += 4;
        }
    }
    for (o, &x) in out[i..].iter_mut().zip(&src[i..]) {
        *o = x as i32;
    }
}

pub(super) fn f64_to_i32(src: &[f64], out: &mut [i32]) {
    assert_eq!(src.len(), out.len());
    let mut i = 0usize;
    unsafe {
        let indefinite = _mm_set1_epi32(i32::MIN);
        while i + 2 <= src.len() {
            let r = _mm_cvttpd_epi32(_mm_loadu_pd(src.as_ptr().add(i)));
            _mm_storel_epi64(out.as_mut_ptr().add(i) as *mut __m128i, r);
            if _mm_movemask_epi8(_mm_cmpeq_epi32(r, indefinite)) != 0 {
                for j in i..i + 2 {
                    out[j] = src[j] as i32;
                }
            }
            i += 2;
        }
    }
    for (o, &x) in out[i..].iter_mut().zip(&src[i..]) {
        *o = x as i32;
    }
}

/// 8-bit to 16-bit lanes, sign- or zero-extended.
pub(super) fn widen_8_to_16(src: &[u8], out: &mut [u16], signed: bool) {
    assert_eq!(src.len(), out.len());
    let mut i = 0usize;
    unsafe {
        let zero = _mm_setzero_si128();
        while i + 16 <= src.len() {
            let v = _mm_loadu_si128(src.as_ptr().add(i) as *const __m128i);
            let (lo, hi) = if signed {
                (
                    _mm_srai_epi16(_mm_unpacklo_epi8(v, v), 8),
                    _mm_srai_epi16(_mm_unpackhi_epi8(v, v), 8),
                )
            } else {
                (_mm_unpacklo_epi8(v, zero), _mm_unpackhi_epi8(v, zero))
            };
            _mm_storeu_si128(out.as_mut_ptr().add(i) as *mut __m128i, lo);
            _mm_storeu_si128(out.as_mut_ptr().add(i + 8) as *mut __m128i, hi);
            i += 16;
        }
    }
    for (o, &x) in out[i..].iter_mut().zip(&src[i..]) {
        *o = if signed { x as i8 as i16 as u16 } else { u16::from(x) };
    }
}

/// 16-bit to 32-bit lanes, sign- or zero-extended.
pub(super) fn widen_16_to_32(src: &[u16], out: &mut [u32], signed: bool) {
    assert_eq!(src.len(), out.len());
    let mut i = 0usize;
    unsafe {
        let zero = _mm_setzero_si128();
        while i + 8 <= src.len() {
            let v = _mm_loadu_si128(src.as_ptr().add(i) as *const __m128i);
            let (lo, hi) = if signed {
                (
                    _mm_srai_epi32(_mm_unpacklo_epi16(v, v), 16),
                    _mm_srai_epi32(_mm_unpackhi_epi16(v, v), 16),
                )
            } else {
                (_mm_unpacklo_epi16(v, zero), _mm_unpackhi_epi16(v, zero))
            };
            _mm_storeu_si128(out.as_mut_ptr().add(i) as *mut __m128i, lo);
            _mm_storeu_si128(out.as_mut_ptr().add(i + 4) as *mut __m128i, hi);
            i += 8;
        }
    }
    for (o, &x) in out[i..].iter_mut().zip(&src[i..]) {
        *o = if signed { x as i16 as i32 as u32 } else { u32::from(x) };
    }
}

/// Keeps the low byte of each 16-bit lane.
pub(super) fn narrow_16_to_8(src: &[u16], out: &mut [u8]) {
    assert_eq!(src.len(), out.len());
    let mut i = 0usize;
    unsafe {
        let mask = _mm_set1_epi16(0x00FF);
        while i + 16 <= src.len() {
            let a = _mm_and_si128(_mm_loadu_si128(src.as_ptr().add(i) as *const __m128i), mask);
            let b = _mm_and_si128(
                _mm_loadu_si128(src.as_ptr().add(i + 8) as *const __m128i),
                mask,
            );
            _mm_storeu_si128(out.as_mut_ptr().add(i) as *mut __m128i, _mm_packus_epi16(a, b));
            i += 16;
        }
    }
    for (o, &x) in out[i..].iter_mut().zip(&src[i..]) {
        *o = x as u8;
    }
}

/// Keeps the low half of each 32-bit lane.
pub(super) fn narrow_32_to_16(src: &[u32], out: &mut [u16]) {
    assert_eq!(src.len(), out.len());
    let mut i = 0usize;
    unsafe {
        while i + 8 <= src.len() {
            let a = _mm_loadu_si128(src.as_ptr().add(i) as *const __m128i);
            let b = _mm_loadu_si128(src.as_ptr().add(i + 4) as *const __m128i);
            // Sign-extend the low halves so the saturating pack is exact.
            let a = _mm_srai_epi32(_mm_slli_epi32(a, 16), 16);
            let b = _mm_srai_epi32(_mm_slli_epi32(b, 16), 16);
            _mm_storeu_si128(out.as_mut_ptr().add(i) as *mut __m128i, _mm_packs_epi32(a, b));
            i += 8;
        }
    }
    for (o, &x) in out[i..].iter_mut().zip(&src[i..]) {
        *o = x as u16;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_u8_wraps_with_tail() {
        let mut data: Vec<u8> = (0..19).map(|i| 250u8.wrapping_add(i)).collect();
        let expected: Vec<u8> = data.iter().map(|x| x.wrapping_add(10)).collect();
        add_u8(&mut data, 10);
        assert_eq!(data, expected);
    }

    #[test]
    fn test_mul_u32_matches_wrapping() {
        let mut data: Vec<u32> = vec![0, 1, u32::MAX, 0x8000_0001, 123_456_789, 7, 9];
        let expected: Vec<u32> = data.iter().map(|x| x.wrapping_mul(0xDEAD_BEEF)).collect();
        mul_u32(&mut data, 0xDEAD_BEEF);
        assert_eq!(data, expected);
    }

    #[test]
    fn test_mul_u8_matches_wrapping() {
        let mut data: Vec<u8> = (0..=255).collect();
        let expected: Vec<u8> = data.iter().map(|x| x.wrapping_mul(201)).collect();
        mul_u8(&mut data, 201);
        assert_eq!(data, expected);
    }

    #[test]
    fn test_f32_to_i32_out_of_range_lanes() {
        let src = [1.9f32, -2.5, f32::NAN, 3.0e10, -3.0e10, f32::INFINITY, 0.5, -0.0, 7.0];
        let mut out = vec![0i32; src.len()];
        f32_to_i32(&src, &mut out);
        let expected: Vec<i32> = src.iter().map(|&x| x as i32).collect();
        assert_eq!(out, expected);
    }

    #[test]
    fn test_f64_to_i32_out_of_range_lanes() {
        let src = [f64::NAN, 2.0e12, -1.5, 4.99];
        let mut out = vec![0i32; src.len()];
        f64_to_i32(&src, &mut out);
        assert_eq!(out, vec![0, i32::MAX, -1, 4]);
    }

    #[test]
    fn test_widen_and_narrow() {
        let src: Vec<u8> = (0..=255).collect();
        let mut wide = vec![0u16; src.len()];
        widen_8_to_16(&src, &mut wide, true);
        assert!(wide.iter().zip(&src).all(|(&w, &s)| w == s as i8 as i16 as u16));

        let mut narrow = vec![0u8; wide.len()];
        narrow_16_to_8(&wide, &mut narrow);
        assert_eq!(narrow, src);

        let words: Vec<u32> = vec![0x1234_8000, 0xFFFF_FFFF, 0x0001_7FFF, 5, 0x8000_0000, 9, 10, 11, 12];
        let mut halves = vec![0u16; words.len()];
        narrow_32_to_16(&words, &mut halves);
        assert_eq!(halves, words.iter().map(|&w| w as u16).collect::<Vec<_>>());
    }
}
