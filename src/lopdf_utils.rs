use crate::Error;
use lopdf::content::Operation;
use lopdf::Object;

/// Read an `Integer` or `Real` as `f64`.
pub(crate) fn as_number(obj: &Object) -> Result<f64, Error> {
    match obj {
        Object::Integer(value) => Ok(*value as f64),
        Object::Real(value) => Ok(f64::from(*value)),
        _ => Err(Error::LoPdfError(lopdf::Error::Type)),
    }
}

pub(crate) fn real(value: f64) -> Object {
    Object::Real(value as _)
}

pub(crate) fn as_option_integer(obj: Option<&Object>) -> Result<Option<i64>, Error> {
    Ok(obj.map(|obj| obj.as_i64()).transpose()?)
}

pub(crate) fn name<N: AsRef<[u8]>>(name: N) -> Object {
    Object::Name(name.as_ref().to_vec())
}

/// `q a 0 0 d e f cm /Name Do Q`: paint a named XObject scaled to `size`
/// with its lower-left corner at `position`.
/// See p643 (Table A.1) of the PDF reference for the operators.
pub(crate) fn paint_xobject(
    xobject_name: &str,
    position: (f64, f64),
    size: (f64, f64),
) -> Vec<Operation> {
    vec![
        // `q` = Save graphics state
        Operation::new("q", vec![]),
        // `cm` = Concatenate matrix to current transformation matrix
        Operation::new(
            "cm",
            vec![
                real(size.0),
                Object::Integer(0),
                Object::Integer(0),
                real(size.1),
                real(position.0),
                real(position.1),
            ],
        ),
        // `Do` = Invoke named XObject
        Operation::new("Do", vec![name(xobject_name)]),
        // `Q` = Restore graphics state
        Operation::new("Q", vec![]),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numbers_accept_integer_and_real() {
        assert_eq!(as_number(&Object::Integer(612)).unwrap(), 612.0);
        assert_eq!(as_number(&real(0.5)).unwrap(), 0.5);
        assert!(as_number(&name("MediaBox")).is_err());
    }

    #[test]
    fn paint_is_wrapped_in_graphics_state() {
        let ops = paint_xobject("Sig", (170.0, 150.0), (150.0, 30.0));
        let operators: Vec<&str> = ops.iter().map(|op| op.operator.as_str()).collect();
        assert_eq!(operators, vec!["q", "cm", "Do", "Q"]);
        assert_eq!(ops[2].operands[0].as_name_str().unwrap(), "Sig");
    }
}
