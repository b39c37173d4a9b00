//! Capacity normalization.
//!
//! A requested capacity is mapped to a physical table capacity compatible
//! with the active probing scheme: the slot count is always a whole number of
//! probe clusters (`cg_size x bucket_size` slots), and the number of clusters
//! is taken from a curated sparse prime table so the double-hashing step size
//! is coprime with the cycle length. Linear probing uses the same table; a
//! prime cluster count merely costs a few spare slots there.

/// Normalized capacity descriptor for a table.
///
/// Construct one with [`valid_extent`]; the stored value is final and is the
/// exact slot count allocated by the container. `valid_extent` is a `const
/// fn`, so a compile-time extent is just a `const` binding.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Extent(usize);

impl Extent {
    /// The physical slot capacity.
    pub const fn value(self) -> usize {
        self.0
    }
}

/// Cluster counts spaced roughly 5% apart: a leading 1 for the minimum
/// extent, then primes up to 2^48.
const PRIME_CLUSTER_COUNTS: &[u64] = &[
    1, 2, 3, 5, 7, 11,
    13, 17, 19, 23, 29, 31,
    37, 41, 47, 53, 59, 67,
    71, 79, 83, 89, 97, 103,
    109, 127, 137, 149, 157, 167,
    179, 191, 211, 223, 239, 251,
    269, 283, 307, 331, 349, 367,
    389, 409, 431, 457, 487, 521,
    557, 587, 617, 653, 691, 727,
    769, 809, 853, 907, 953, 1009,
    1061, 1117, 1181, 1249, 1319, 1399,
    1471, 1549, 1627, 1709, 1801, 1901,
    1997, 2099, 2207, 2333, 2459, 2591,
    2729, 2879, 3023, 3181, 3343, 3511,
    3691, 3877, 4073, 4283, 4507, 4733,
    4973, 5227, 5501, 5779, 6073, 6379,
    6701, 7039, 7393, 7789, 8179, 8597,
    9029, 9491, 9967, 10477, 11003, 11579,
    12161, 12781, 13421, 14107, 14813, 15559,
    16339, 17159, 18041, 18947, 19913, 20921,
    21977, 23081, 24239, 25453, 26729, 28069,
    29473, 30949, 32497, 34123, 35831, 37633,
    39521, 41507, 43591, 45779, 48073, 50497,
    53047, 55711, 58511, 61441, 64553, 67783,
    71191, 74759, 78497, 82457, 86587, 90917,
    95467, 100267, 105319, 110587, 116131, 121949,
    128047, 134471, 141199, 148279, 155693, 163481,
    171659, 180247, 189271, 198761, 208721, 219169,
    230137, 241651, 253741, 266447, 279779, 293773,
    308467, 323899, 340103, 357109, 374977, 393727,
    413417, 434107, 455827, 478627, 502591, 527729,
    554117, 581843, 610957, 641513, 673609, 707293,
    742663, 779797, 818813, 859783, 902777, 947917,
    995327, 1045111, 1097377, 1152287, 1209931, 1270429,
    1333963, 1400669, 1470709, 1544311, 1621537, 1702627,
    1787783, 1877177, 1971049, 2069603, 2173099, 2281771,
    2395867, 2515673, 2641459, 2773549, 2912227, 3057839,
    3210743, 3371297, 3539863, 3716857, 3902713, 4097869,
    4302763, 4517911, 4743821, 4981019, 5230091, 5491597,
    5766203, 6054527, 6357287, 6675161, 7008943, 7359397,
    7727371, 8113753, 8519471, 8945449, 9392729, 9862379,
    10355509, 10873327, 11417011, 11987863, 12587257, 13216631,
    13877497, 14571379, 15299951, 16064969, 16868221, 17711647,
    18597233, 19527103, 20503459, 21528673, 22605109, 23735377,
    24922147, 26168293, 27476731, 28850597, 30293141, 31807807,
    33398203, 35068133, 36821557, 38662643, 40595777, 42625619,
    44756917, 46994803, 49344587, 51811817, 54402409, 57122557,
    59978701, 62977643, 66126547, 69432889, 72904543, 76549799,
    80377289, 84396187, 88616027, 93046847, 97699201, 102584179,
    107713391, 113099087, 118754171, 124691899, 130926517, 137472857,
    144346511, 151563851, 159142051, 167099173, 175454159, 184226873,
    193438237, 203110153, 213265667, 223929011, 235125463, 246881743,
    259225859, 272187163, 285796541, 300086383, 315090707, 330845243,
    347387533, 364756921, 382994779, 402144521, 422251751, 443364343,
    465532579, 488809213, 513249689, 538912183, 565857793, 594150703,
    623858243, 655051171, 687803773, 722193973, 758303677, 796218877,
    836029847, 877831343, 921722951, 967809121, 1016199631, 1067009623,
    1120360121, 1176378131, 1235197079, 1296956957, 1361804893, 1429895153,
    1501389913, 1576459433, 1655282407, 1738046537, 1824948893, 1916196353,
    2012006173, 2112606521, 2218236869, 2329148713, 2445606161, 2567886481,
    2696280841, 2831094899, 2972649653, 3121282139, 3277346249, 3441213577,
    3613274267, 3793937981, 3983634913, 4182816683, 4391957543, 4611555433,
    4842133291, 5084239961, 5338452071, 5605374679, 5885643431, 6179925623,
    6488921911, 6813368021, 7154036429, 7511738251, 7887325169, 8281691459,
    8695776041, 9130564853, 9587093123, 10066447793, 10569770203, 11098258741,
    11653171687, 12235830281, 12847621807, 13490002961, 14164503113, 14872728289,
    15616364711, 16397182981, 17217042149, 18077894273, 18981789007, 19930878481,
    20927422423, 21973793549, 23072483227, 24226107407, 25437412789, 26709283453,
    28044747637, 29446985069, 30919334363, 32465301101, 34088566181, 35792994499,
    37582644313, 39461776573, 41434865419, 43506608711, 45681939151, 47966036119,
    50364337949, 52882554863, 55526682637, 58303016771, 61218167639, 64279076021,
    67493029831, 70867681327, 74411065411, 78131618687, 82038199631, 86140109617,
    90447115117, 94969470979, 99717944539, 104703841777, 109939033873, 115435985573,
    121207784869, 127268174119, 133631582867, 140313162019, 147328820141, 154695261163,
    162430024243, 170551525457, 179079101749, 188033056859, 197434709737, 207306445253,
    217671767527, 228555355937, 239983123753, 251982279949, 264581393977, 277810463683,
    291700986901, 306286036249, 321600338089, 337680355027, 354564372797, 372292591477,
    390907221071, 410452582153, 430975211273, 452523971843, 475150170437, 498907678963,
    523853062939, 550045716109, 577548001957, 606425402071, 636746672209, 668584005829,
    702013206151, 737113866487, 773969559823, 812668037879, 853301439811, 895966511821,
    940764837433, 987803079337, 1037193233311, 1089052895009, 1143505539797, 1200680816807,
    1260714857681, 1323750600581, 1389938130617, 1459435037287, 1532406789163, 1609027128629,
    1689478485077, 1773952409353, 1862650029839, 1955782531331, 2053571657927, 2156250240829,
    2264062752893, 2377265890583, 2496129185159, 2620935644417, 2751982426639, 2889581547991,
    3034060625411, 3185763656717, 3345051839599, 3512304431611, 3687919653203, 3872315635897,
    4065931417699, 4269227988593, 4482689388029, 4706823857431, 4942165050307, 5189273302867,
    5448736968013, 5721173816417, 6007232507261, 6307594132667, 6622973839319, 6954122531353,
    7301828657951, 7666920090857, 8050266095411, 8452779400243, 8875418370283, 9319189288811,
    9785148753269, 10274406190969, 10788126500531, 11327532825649, 11893909467029, 12488604940403,
    13113035187467, 13768686946853, 14457121294207, 15179977358921, 15938976226931, 16735925038279,
    17572721290219, 18451357354811, 19373925222557, 20342621483687, 21359752557877, 22427740185797,
    23549127195101, 24726583554919, 25962912732677, 27261058369339, 28624111287907, 30055316852311,
    31558082694959, 33135986829709, 34792786171219, 36532425479789, 38359046753789, 40276999091501,
    42290849046107, 44405391498439, 46625661073417, 48956944127101, 51404791333477, 53975030900227,
    56673782445277, 59507471567567, 62482845145951, 65606987403367, 68887336773557, 72331703612249,
    75948288792889, 79745703232549, 83732988394177, 87919637813897, 92315619704629, 96931400689861,
    101777970724373, 106866869260597, 112210212723659, 117820723359851, 123711759527887, 129897347504297,
    136392214879519, 143211825623551, 150372416904763, 157891037750009, 165785589637531, 174074869119433,
    182778612575453, 191917543204259, 201513420364483, 211589091382717, 222168545951903, 233276973249499,
    244940821911979, 257187863007631, 270047256158059,
];

/// Computes the physical capacity for a requested lower-bound capacity.
///
/// `requested` may be zero or negative; both are clamped up to the minimum
/// viable extent of one full probe cluster. The result is always a multiple
/// of `cg_size * bucket_size` and at least `requested`.
///
/// # Panics
///
/// Panics if `cg_size` or `bucket_size` is zero, or if the request exceeds
/// the curated cluster table (beyond 2^48 clusters).
pub const fn valid_extent(requested: i64, cg_size: usize, bucket_size: usize) -> Extent {
    assert!(cg_size > 0, "cooperative group size must be non-zero");
    assert!(bucket_size > 0, "bucket size must be non-zero");

    let stride = cg_size * bucket_size;
    let requested = if requested < 0 { 0 } else { requested as u64 };
    // ceil(requested / stride)
    let clusters = (requested + stride as u64 - 1) / stride as u64;

    let mut i = 0;
    while i < PRIME_CLUSTER_COUNTS.len() {
        if PRIME_CLUSTER_COUNTS[i] >= clusters {
            return Extent(PRIME_CLUSTER_COUNTS[i] as usize * stride);
        }
        i += 1;
    }
    panic!("requested capacity exceeds the maximum supported extent");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn double_hashing_reference_vector() {
        // cg 1, bucket 2, requested 400 -> 211 clusters (prime) -> 422 slots.
        assert_eq!(valid_extent(400, 1, 2).value(), 422);
    }

    #[test]
    fn linear_probing_reference_vector() {
        // cg 2, bucket 2, requested 400 -> 103 clusters (prime) -> 412 slots.
        assert_eq!(valid_extent(400, 2, 2).value(), 412);
    }

    #[test]
    fn zero_and_negative_requests_clamp_to_minimum() {
        let floor = valid_extent(0, 2, 2);
        assert_eq!(floor.value(), 4); // one full cluster
        assert_eq!(valid_extent(-1, 2, 2), floor);
        assert_eq!(valid_extent(i64::MIN, 2, 2), floor);
        assert_eq!(valid_extent(0, 1, 1).value(), 1);
    }

    #[test]
    fn capacity_is_a_cluster_multiple_and_covers_request() {
        for &(cg, bs) in &[(1usize, 1usize), (1, 2), (2, 1), (2, 2), (4, 2), (8, 1)] {
            for requested in [0i64, 1, 7, 100, 1024, 99_991] {
                let capacity = valid_extent(requested, cg, bs).value();
                assert!(capacity >= requested as usize);
                assert_eq!(capacity % (cg * bs), 0, "cg={cg} bs={bs} req={requested}");
            }
        }
    }

    #[test]
    fn evaluates_in_const_context() {
        const EXTENT: Extent = valid_extent(400, 1, 2);
        assert_eq!(EXTENT.value(), 422);
    }

    #[test]
    #[should_panic(expected = "maximum supported extent")]
    fn oversized_request_panics() {
        let _ = valid_extent(i64::MAX, 1, 1);
    }
}
